//! Core data structures for Berth.
//!
//! - Triplets, build types and language standards
//! - Dependency declarations and the port index
//! - Manifests and component declarations
//! - Resolved packages

pub mod component;
pub mod dependency;
pub mod language;
pub mod manifest;
pub mod package;
pub mod profile;
pub mod registry;
pub mod triplet;

pub use component::{
    Component, ComponentDecl, ComponentKind, Define, DependencyEdge, EdgeTarget, LibRef,
    Requirements, Scope, TestProtocol,
};
pub use dependency::{DependencyDeclaration, DependencySpec};
pub use language::{CStandard, CppStandard, Language};
pub use manifest::{find_manifest, DeclarationTree, Manifest, COMPONENTS_FILE, MANIFEST_NAME};
pub use package::ResolvedPackage;
pub use profile::BuildType;
pub use registry::{DirectoryIndex, MemoryIndex, PortIndex, PortSummary};
pub use triplet::{Linkage, Triplet};
