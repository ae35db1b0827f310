//! Component graph composition and building.
//!
//! [`graph::compose`] turns declarations into a [`BuildGraph`] with every
//! requirement closure computed; [`Executor`] builds that graph through a
//! [`Toolchain`].

pub mod alias;
pub mod errors;
pub mod executor;
pub mod graph;
pub mod propagate;
pub mod toolchain;

pub use alias::{external_id, AliasError, AliasRegistry};
pub use errors::{BuildError, BuildFailure, ComposeError, Contributor, SkippedComponent};
pub use executor::{Artifact, Artifacts, BuildOptions, BuildOutcome, Executor};
pub use graph::{compose, BuildGraph, ComposeContext, ComposeOptions};
pub use propagate::{ComponentClosure, ResolvedEdge, TrackedRequirements};
pub use toolchain::{ArchiveInput, CcToolchain, CommandSpec, CompileInput, LinkInput, Toolchain};
