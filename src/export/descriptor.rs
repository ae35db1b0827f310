//! The export descriptor.
//!
//! A JSON document describing every exported component with install-tree
//! paths only, so a consumer can compile and link against the installed
//! project without composing it again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ComponentKind, Requirements, Triplet};
use crate::util::fs::{read_to_string, write_atomic};

/// Current descriptor schema.
pub const SCHEMA_VERSION: u32 = 1;

/// File name of the descriptor.
pub const DESCRIPTOR_FILE: &str = "berth-export.json";

#[derive(Debug, Error, miette::Diagnostic)]
#[error("{} uses descriptor schema {found}, this berth understands schema {}", .path.display(), SCHEMA_VERSION)]
#[diagnostic(code(berth::export::schema))]
pub struct UnsupportedSchema {
    pub path: PathBuf,
    pub found: u32,
}

/// Exported view of a build graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExportDescriptor {
    pub schema: u32,
    pub namespace: String,
    pub triplet: Triplet,
    pub install_root: PathBuf,

    /// External id -> component name
    pub aliases: BTreeMap<String, String>,

    pub components: Vec<ExportedComponent>,

    /// External packages the exported requirements point into
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<ExportedPackage>,
}

/// One exported component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExportedComponent {
    pub name: String,

    /// `namespace::alias`
    pub id: String,

    pub kind: ComponentKind,

    /// Installed artifact, absent for interface components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Everything a consumer needs to compile and link against this
    /// component, with install paths
    pub requirements: Requirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExportedPackage {
    pub name: String,
    pub version: String,
    pub install_path: PathBuf,
}

#[derive(Deserialize)]
struct SchemaHeader {
    schema: u32,
}

impl ExportDescriptor {
    /// Look up a component by external id.
    pub fn component(&self, id: &str) -> Option<&ExportedComponent> {
        let name = self.aliases.get(id)?;
        self.components.iter().find(|c| &c.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize export descriptor")
    }

    /// Write the descriptor atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.to_json()?.as_bytes())
    }

    /// Read a descriptor, rejecting schemas other than [`SCHEMA_VERSION`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        let header: SchemaHeader = serde_json::from_str(&contents)
            .with_context(|| format!("{} is not an export descriptor", path.display()))?;
        if header.schema != SCHEMA_VERSION {
            return Err(UnsupportedSchema {
                path: path.to_path_buf(),
                found: header.schema,
            }
            .into());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse export descriptor {}", path.display()))
    }
}
