//! Resolved packages.
//!
//! A [`ResolvedPackage`] is the result of resolving and installing one
//! external dependency for one triplet. It is what components link against
//! when they name a package in their dependency lists.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::component::{LibRef, Requirements};
use crate::core::triplet::Triplet;

/// An installed, platform-specific package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Version,
    pub triplet: Triplet,
    pub install_path: PathBuf,

    /// Link library names exported by the package (`fmt`, `edit`)
    #[serde(default)]
    pub exports: Vec<String>,

    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl ResolvedPackage {
    /// Directory name of a package inside a triplet's install tree.
    pub fn dir_name(name: &str, version: &Version) -> String {
        format!("{}-{}", name, version)
    }

    /// Install location under `install_root` for `triplet`.
    pub fn install_path_for(
        install_root: &Path,
        triplet: &Triplet,
        name: &str,
        version: &Version,
    ) -> PathBuf {
        triplet
            .install_dir(install_root)
            .join(Self::dir_name(name, version))
    }

    pub fn include_dir(&self) -> PathBuf {
        self.install_path.join("include")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.install_path.join("lib")
    }

    pub fn has_export(&self, target: &str) -> bool {
        self.exports.iter().any(|e| e == target)
    }

    /// Requirements a consumer picks up from this package.
    ///
    /// With `target` set only that export is linked, otherwise every export.
    pub fn usage_requirements(&self, target: Option<&str>) -> Requirements {
        let libs: Vec<LibRef> = match target {
            Some(t) => vec![LibRef::system(t)],
            None => self.exports.iter().map(LibRef::system).collect(),
        };

        let include_dir = self.include_dir();
        let lib_dir = self.lib_dir();
        Requirements {
            include_dirs: if include_dir.is_dir() {
                vec![include_dir]
            } else {
                Vec::new()
            },
            link_dirs: if libs.is_empty() { Vec::new() } else { vec![lib_dir] },
            link_libraries: libs,
            ..Default::default()
        }
    }
}
