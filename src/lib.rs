//! berth - dependency resolution, component composition and test discovery
//! for C and C++ projects.
//!
//! A project's external dependencies are resolved against a port index and
//! installed per triplet, its components are composed into a build graph
//! with scoped requirement propagation, and the result is exported with a
//! descriptor that consumers use without composing the project again.

pub mod builder;
pub mod core;
pub mod export;
pub mod install;
pub mod ops;
pub mod resolver;
pub mod testing;
pub mod toolchain;
pub mod util;

pub use builder::{BuildGraph, BuildOptions};
pub use core::{Component, Manifest, Triplet};
pub use resolver::InstallPlan;
pub use util::context::GlobalContext;
