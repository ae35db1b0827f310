//! Port index - where package metadata comes from.
//!
//! The resolver never touches the filesystem layout of a registry directly;
//! it asks a [`PortIndex`] for every published version of a package name.
//! [`DirectoryIndex`] reads the on-disk layout
//! `<root>/<first-letter>/<name>/<version>.toml`, [`MemoryIndex`] holds
//! summaries in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::Version;
use serde::Deserialize;

use crate::core::dependency::{parse_declarations, DependencyDeclaration, DependencySpec};

/// Everything the resolver and installer need to know about one port version.
#[derive(Debug, Clone)]
pub struct PortSummary {
    pub name: String,
    pub version: Version,
    pub dependencies: Vec<DependencyDeclaration>,

    /// Link library names the installed package provides
    pub exports: Vec<String>,

    /// Optional features this version offers
    pub features: BTreeSet<String>,

    /// Command producing the install tree, run by the port builder
    pub build_command: Option<Vec<String>>,

    /// Directory holding the port's `files/` tree and build scripts
    pub port_dir: Option<PathBuf>,
}

impl PortSummary {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        PortSummary {
            name: name.into(),
            version,
            dependencies: Vec::new(),
            exports: Vec::new(),
            features: BTreeSet::new(),
            build_command: None,
            port_dir: None,
        }
    }

    pub fn with_dependency(mut self, dep: DependencyDeclaration) -> Self {
        self.dependencies.push(dep);
        self
    }

    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = exports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }
}

/// A source of port metadata.
pub trait PortIndex: Send + Sync {
    /// All published versions of `name`, highest first. Empty when the
    /// index does not know the package.
    fn query(&self, name: &str) -> Result<Vec<PortSummary>>;

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PortFile {
    package: PortPackage,
    #[serde(default)]
    build: Option<PortBuild>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PortPackage {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<DependencySpec>,
    #[serde(default)]
    exports: Vec<String>,
    #[serde(default)]
    features: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PortBuild {
    command: Vec<String>,
}

/// Port index backed by a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    root: PathBuf,
}

impl DirectoryIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryIndex { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every version file of `name`.
    pub fn package_dir(&self, name: &str) -> PathBuf {
        let shard = name.chars().next().map(String::from).unwrap_or_default();
        self.root.join(shard).join(name)
    }

    fn load_port_file(&self, name: &str, path: &Path) -> Result<PortSummary> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read port file {}", path.display()))?;
        let file: PortFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse port file {}", path.display()))?;

        if file.package.name != name {
            bail!(
                "port file {} declares package `{}`, expected `{}`",
                path.display(),
                file.package.name,
                name
            );
        }

        let version = Version::parse(&file.package.version).with_context(|| {
            format!(
                "invalid version `{}` in port file {}",
                file.package.version,
                path.display()
            )
        })?;

        let dependencies = parse_declarations(&file.package.dependencies)
            .with_context(|| format!("invalid dependencies in port file {}", path.display()))?;

        let port_dir = path.with_extension("");
        Ok(PortSummary {
            name: file.package.name,
            version,
            dependencies,
            exports: file.package.exports,
            features: file.package.features.into_iter().collect(),
            build_command: file.build.map(|b| b.command),
            port_dir: Some(port_dir),
        })
    }
}

impl PortIndex for DirectoryIndex {
    fn query(&self, name: &str) -> Result<Vec<PortSummary>> {
        let dir = self.package_dir(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to list port directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                summaries.push(self.load_port_file(name, &path)?);
            }
        }

        summaries.sort_by(|a, b| b.version.cmp(&a.version));
        tracing::debug!("{} versions of `{}` in {}", summaries.len(), name, dir.display());
        Ok(summaries)
    }

    fn describe(&self) -> String {
        format!("registry at {}", self.root.display())
    }
}

/// In-memory port index.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    ports: BTreeMap<String, Vec<PortSummary>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, summary: PortSummary) {
        let versions = self.ports.entry(summary.name.clone()).or_default();
        versions.retain(|s| s.version != summary.version);
        versions.push(summary);
        versions.sort_by(|a, b| b.version.cmp(&a.version));
    }

    pub fn with(mut self, summary: PortSummary) -> Self {
        self.add(summary);
        self
    }
}

impl PortIndex for MemoryIndex {
    fn query(&self, name: &str) -> Result<Vec<PortSummary>> {
        Ok(self.ports.get(name).cloned().unwrap_or_default())
    }

    fn describe(&self) -> String {
        "in-memory registry".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_port(root: &Path, name: &str, version: &str, body: &str) {
        let index = DirectoryIndex::new(root);
        let dir = index.package_dir(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.toml", version)),
            format!(
                "[package]\nname = \"{}\"\nversion = \"{}\"\n{}",
                name, version, body
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_directory_index_layout() {
        let tmp = TempDir::new().unwrap();
        write_port(tmp.path(), "editline", "1.16.0", "exports = [\"edit\"]\n");
        write_port(
            tmp.path(),
            "editline",
            "1.17.1",
            "exports = [\"edit\"]\nfeatures = [\"utf8\"]\ndependencies = [\"ncurses\"]\n\n[build]\ncommand = [\"sh\", \"build.sh\"]\n",
        );

        let index = DirectoryIndex::new(tmp.path());
        assert_eq!(
            index.package_dir("editline"),
            tmp.path().join("e").join("editline")
        );

        let versions = index.query("editline").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, Version::new(1, 17, 1));
        assert_eq!(versions[0].exports, vec!["edit"]);
        assert!(versions[0].features.contains("utf8"));
        assert_eq!(versions[0].dependencies[0].name(), "ncurses");
        assert_eq!(
            versions[0].build_command.as_deref(),
            Some(&["sh".to_string(), "build.sh".to_string()][..])
        );
        assert_eq!(versions[1].version, Version::new(1, 16, 0));
    }

    #[test]
    fn test_unknown_package_is_empty() {
        let tmp = TempDir::new().unwrap();
        let index = DirectoryIndex::new(tmp.path());
        assert!(index.query("zlib").unwrap().is_empty());
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let tmp = TempDir::new().unwrap();
        let dir = DirectoryIndex::new(tmp.path()).package_dir("zlib");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("1.3.0.toml"),
            "[package]\nname = \"zstd\"\nversion = \"1.3.0\"\n",
        )
        .unwrap();

        let err = DirectoryIndex::new(tmp.path()).query("zlib").unwrap_err();
        assert!(err.to_string().contains("expected `zlib`"));
    }

    #[test]
    fn test_memory_index_orders_and_replaces() {
        let index = MemoryIndex::new()
            .with(PortSummary::new("fmt", Version::new(9, 1, 0)))
            .with(PortSummary::new("fmt", Version::new(10, 2, 1)))
            .with(PortSummary::new("fmt", Version::new(9, 1, 0)).with_exports(["fmt"]));

        let versions = index.query("fmt").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, Version::new(10, 2, 1));
        assert_eq!(versions[1].exports, vec!["fmt"]);
    }
}
