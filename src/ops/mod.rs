//! High-level operations.
//!
//! This module contains the implementation of berth commands.

pub mod build;
pub mod configure;
pub mod exit;
pub mod export;
pub mod resolve;
pub mod test;

pub use build::build;
pub use configure::{configure, ConfigureOptions, Configured};
pub use exit::{diagnostic_for, ExitClass};
pub use export::{build_and_export, default_prefix, export_artifacts};
pub use resolve::{resolve_project, ResolveOptions};
pub use test::{build_and_test, TestFailure};

pub use crate::testing::test;
