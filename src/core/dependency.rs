//! Dependency declarations.
//!
//! A [`DependencyDeclaration`] names an external package, the versions that
//! are acceptable, and the optional features requested from it. Declarations
//! are immutable once parsed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("static regex"));

/// Check that a package name is lowercase ascii alphanumerics and hyphens.
pub fn validate_package_name(name: &str) -> Result<()> {
    if !PACKAGE_NAME.is_match(name) {
        bail!(
            "invalid package name `{}`: names use lowercase letters, digits and `-`, \
             and start with a letter or digit",
            name
        );
    }
    Ok(())
}

/// A single external dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDeclaration {
    name: String,
    version_req: VersionReq,
    features: BTreeSet<String>,
}

impl DependencyDeclaration {
    /// Any version, no features.
    pub fn new(name: impl Into<String>) -> Self {
        DependencyDeclaration {
            name: name.into(),
            version_req: VersionReq::STAR,
            features: BTreeSet::new(),
        }
    }

    pub fn with_version_req(mut self, req: VersionReq) -> Self {
        self.version_req = req;
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_req(&self) -> &VersionReq {
        &self.version_req
    }

    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    pub fn matches_version(&self, version: &Version) -> bool {
        self.version_req.matches(version)
    }
}

impl fmt::Display for DependencyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version_req)?;
        if !self.features.is_empty() {
            let features: Vec<&str> = self.features.iter().map(String::as_str).collect();
            write!(f, " [{}]", features.join(", "))?;
        }
        Ok(())
    }
}

/// Dependency entry as written in a manifest or port file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Plain package name: `"catch2"`
    Name(String),

    /// Detailed specification
    Detailed(DetailedDependencySpec),
}

/// `{ name = "editline", version = ">=1.17", features = ["utf8"] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedDependencySpec {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub features: Vec<String>,
}

impl DependencySpec {
    pub fn name(&self) -> &str {
        match self {
            DependencySpec::Name(name) => name,
            DependencySpec::Detailed(d) => &d.name,
        }
    }

    /// Validate and convert into a declaration.
    pub fn to_declaration(&self) -> Result<DependencyDeclaration> {
        validate_package_name(self.name())?;

        match self {
            DependencySpec::Name(name) => Ok(DependencyDeclaration::new(name.clone())),
            DependencySpec::Detailed(d) => {
                let version_req = match d.version.as_deref() {
                    None | Some("") | Some("*") => VersionReq::STAR,
                    Some(v) => VersionReq::parse(v).with_context(|| {
                        format!("invalid version constraint `{}` for `{}`", v, d.name)
                    })?,
                };
                Ok(DependencyDeclaration::new(d.name.clone())
                    .with_version_req(version_req)
                    .with_features(d.features.iter().cloned()))
            }
        }
    }
}

/// Convert a list of specs, rejecting duplicate names.
pub fn parse_declarations(specs: &[DependencySpec]) -> Result<Vec<DependencyDeclaration>> {
    let mut seen = BTreeSet::new();
    let mut decls = Vec::with_capacity(specs.len());
    for spec in specs {
        if !seen.insert(spec.name().to_string()) {
            bail!("dependency `{}` is declared more than once", spec.name());
        }
        decls.push(spec.to_declaration()?);
    }
    Ok(decls)
}
