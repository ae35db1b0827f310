//! Berth.toml manifest parsing and schema.
//!
//! The root manifest declares the package, its external dependencies and the
//! first level of components. Subdirectories listed under `[build] subdirs`
//! each carry a `components.toml` with further component declarations, which
//! may in turn list their own subdirectories.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::component::ComponentDecl;
use crate::core::dependency::{
    parse_declarations, validate_package_name, DependencyDeclaration, DependencySpec,
};

/// Root manifest file name.
pub const MANIFEST_NAME: &str = "Berth.toml";

/// Declaration file inside a subdirectory.
pub const COMPONENTS_FILE: &str = "components.toml";

/// The parsed Berth.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDecl>,
}

/// The `[package]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,

    pub version: String,

    /// Export namespace, defaults to the package name
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// The `[build]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    #[serde(default)]
    pub subdirs: Vec<PathBuf>,
}

/// A subdirectory's `components.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentsFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDecl>,
}

impl ComponentsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

impl Manifest {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid manifest {}", path.display()))
    }

    /// Parse and validate manifest text.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        validate_package_name(&self.package.name)?;
        self.version()?;
        self.dependencies()?;
        if let Some(ns) = &self.package.namespace {
            if ns.is_empty() || ns.contains("::") {
                bail!("invalid namespace `{}`", ns);
            }
        }
        for subdir in &self.build.subdirs {
            validate_subdir(subdir)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn version(&self) -> Result<Version> {
        Version::parse(&self.package.version)
            .with_context(|| format!("invalid package version `{}`", self.package.version))
    }

    pub fn namespace(&self) -> &str {
        self.package
            .namespace
            .as_deref()
            .unwrap_or(&self.package.name)
    }

    /// Declared external dependencies, validated.
    pub fn dependencies(&self) -> Result<Vec<DependencyDeclaration>> {
        parse_declarations(&self.package.dependencies)
    }

    /// Load the full declaration tree rooted at `root_dir`.
    pub fn declaration_tree(&self, root_dir: &Path) -> Result<DeclarationTree> {
        let mut visited = BTreeSet::new();
        visited.insert(normalize(root_dir));
        let children = load_children(root_dir, &self.build.subdirs, &mut visited)?;
        Ok(DeclarationTree {
            source_dir: root_dir.to_path_buf(),
            declared_in: root_dir.join(MANIFEST_NAME),
            components: self.components.clone(),
            children,
        })
    }
}

/// Component declarations of one directory and its subdirectories.
#[derive(Debug, Clone)]
pub struct DeclarationTree {
    pub source_dir: PathBuf,
    pub declared_in: PathBuf,
    pub components: Vec<ComponentDecl>,
    pub children: Vec<DeclarationTree>,
}

impl DeclarationTree {
    /// A single-level tree, no subdirectories.
    pub fn flat(source_dir: impl Into<PathBuf>, components: Vec<ComponentDecl>) -> Self {
        let source_dir = source_dir.into();
        DeclarationTree {
            declared_in: source_dir.join(MANIFEST_NAME),
            source_dir,
            components,
            children: Vec::new(),
        }
    }

    /// Total number of declarations in the tree.
    pub fn len(&self) -> usize {
        self.components.len() + self.children.iter().map(DeclarationTree::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_subdir(subdir: &Path) -> Result<()> {
    if subdir.is_absolute()
        || subdir
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        bail!(
            "subdirectory `{}` must be a relative path inside the project",
            subdir.display()
        );
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn load_children(
    parent_dir: &Path,
    subdirs: &[PathBuf],
    visited: &mut BTreeSet<PathBuf>,
) -> Result<Vec<DeclarationTree>> {
    let mut children = Vec::with_capacity(subdirs.len());
    for subdir in subdirs {
        validate_subdir(subdir)?;
        let dir = parent_dir.join(subdir);
        let file = dir.join(COMPONENTS_FILE);
        if !file.is_file() {
            bail!(
                "subdirectory `{}` has no {}",
                subdir.display(),
                COMPONENTS_FILE
            );
        }
        if !visited.insert(normalize(&dir)) {
            bail!("subdirectory `{}` is listed more than once", dir.display());
        }

        let parsed = ComponentsFile::load(&file)?;
        let grandchildren = load_children(&dir, &parsed.build.subdirs, visited)?;
        children.push(DeclarationTree {
            source_dir: dir,
            declared_in: file,
            components: parsed.components,
            children: grandchildren,
        });
    }
    Ok(children)
}

/// Search upward from `start` for a Berth.toml.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::ComponentKind;
    use tempfile::TempDir;

    const CALC: &str = r#"
[package]
name = "calc"
version = "0.3.0"
dependencies = ["catch2", { name = "editline", version = ">=1.17", features = ["utf8"] }]

[build]
subdirs = ["tests"]

[[component]]
name = "library"
kind = "library"
sources = ["src/lib/*.c"]
alias = "core"
exposed = { include-dirs = ["include"] }
internal-deps = ["editline"]

[[component]]
name = "calc"
kind = "executable"
sources = ["src/main.c"]
internal-deps = ["library"]
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(CALC).unwrap();
        assert_eq!(manifest.name(), "calc");
        assert_eq!(manifest.namespace(), "calc");
        assert_eq!(manifest.version().unwrap(), Version::new(0, 3, 0));

        let deps = manifest.dependencies().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[1].name(), "editline");

        assert_eq!(manifest.components.len(), 2);
        assert_eq!(manifest.components[0].alias.as_deref(), Some("core"));
        assert_eq!(manifest.components[1].kind, ComponentKind::Executable);
    }

    #[test]
    fn test_explicit_namespace() {
        let manifest =
            Manifest::parse("[package]\nname = \"calc\"\nversion = \"1.0.0\"\nnamespace = \"Calc\"\n")
                .unwrap();
        assert_eq!(manifest.namespace(), "Calc");
    }

    #[test]
    fn test_rejects_bad_manifest() {
        assert!(Manifest::parse("[package]\nname = \"Calc\"\nversion = \"1.0.0\"\n").is_err());
        assert!(Manifest::parse("[package]\nname = \"calc\"\nversion = \"one\"\n").is_err());
        assert!(Manifest::parse(
            "[package]\nname = \"calc\"\nversion = \"1.0.0\"\n[build]\nsubdirs = [\"../x\"]\n"
        )
        .is_err());
        assert!(Manifest::parse(
            "[package]\nname = \"calc\"\nversion = \"1.0.0\"\n[[component]]\nname = \"a\"\nkind = \"plugin\"\n"
        )
        .is_err());
    }

    #[test]
    fn test_declaration_tree() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("tests/unit")).unwrap();
        std::fs::write(
            tmp.path().join("tests").join(COMPONENTS_FILE),
            "[build]\nsubdirs = [\"unit\"]\n\n[[component]]\nname = \"helpers\"\nkind = \"interface\"\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("tests/unit").join(COMPONENTS_FILE),
            "[[component]]\nname = \"unit_test\"\nkind = \"test\"\nsources = [\"*.c\"]\n",
        )
        .unwrap();

        let manifest = Manifest::parse(CALC).unwrap();
        let tree = manifest.declaration_tree(tmp.path()).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].source_dir, tmp.path().join("tests"));
        assert_eq!(tree.children[0].children[0].components[0].name, "unit_test");
    }

    #[test]
    fn test_missing_subdir_file() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::parse(CALC).unwrap();
        let err = manifest.declaration_tree(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(COMPONENTS_FILE));
    }

    #[test]
    fn test_find_manifest_walks_up() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), CALC).unwrap();
        let nested = tmp.path().join("src/lib");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_manifest(&nested), Some(tmp.path().join(MANIFEST_NAME)));
    }
}
