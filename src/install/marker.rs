//! Install markers.
//!
//! A marker records that a package was fully installed for a triplet with a
//! given feature set. It is written atomically and only after the install
//! tree is in place, so a missing marker always means "not installed".

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::{ResolvedPackage, Triplet};
use crate::resolver::PlannedInstall;
use crate::util::fs::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallMarker {
    pub name: String,
    pub version: Version,
    pub triplet: Triplet,
    pub feature_hash: String,
    pub features: BTreeSet<String>,
    pub install_path: PathBuf,
    pub files: usize,

    /// Link library names the port exports
    #[serde(default)]
    pub exports: Vec<String>,
}

impl InstallMarker {
    pub fn for_step(
        step: &PlannedInstall,
        triplet: &Triplet,
        install_path: PathBuf,
        files: usize,
    ) -> Self {
        InstallMarker {
            name: step.name().to_string(),
            version: step.version().clone(),
            triplet: triplet.clone(),
            feature_hash: step.feature_hash(),
            features: step.features.clone(),
            install_path,
            files,
            exports: step.port.exports.clone(),
        }
    }

    /// The installed package this marker describes.
    pub fn to_package(&self) -> ResolvedPackage {
        ResolvedPackage {
            name: self.name.clone(),
            version: self.version.clone(),
            triplet: self.triplet.clone(),
            install_path: self.install_path.clone(),
            exports: self.exports.clone(),
            features: self.features.clone(),
        }
    }

    /// Read a marker. A missing or unreadable marker counts as absent.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::warn!("ignoring corrupt install marker {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("failed to serialize install marker")?;
        write_atomic(path, &json)
    }

    /// Whether this marker covers `step` exactly: same name, version,
    /// triplet and feature set, with the install tree still present.
    pub fn satisfies(&self, step: &PlannedInstall, triplet: &Triplet) -> bool {
        self.name == step.name()
            && &self.version == step.version()
            && &self.triplet == triplet
            && self.feature_hash == step.feature_hash()
            && self.install_path.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PortSummary;
    use tempfile::TempDir;

    fn step(features: &[&str]) -> PlannedInstall {
        PlannedInstall {
            port: PortSummary::new("catch2", Version::new(3, 5, 2)),
            features: features.iter().map(|f| f.to_string()).collect(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_round_trip_and_satisfies() {
        let tmp = TempDir::new().unwrap();
        let triplet: Triplet = "x64-linux".parse().unwrap();
        let marker_path = tmp.path().join("catch2.json");
        let install = tmp.path().join("catch2-3.5.2");
        std::fs::create_dir_all(&install).unwrap();

        let marker = InstallMarker::for_step(&step(&[]), &triplet, install.clone(), 0);
        marker.write(&marker_path).unwrap();

        let loaded = InstallMarker::load(&marker_path).unwrap();
        assert_eq!(loaded, marker);
        assert!(loaded.satisfies(&step(&[]), &triplet));
        assert!(!loaded.satisfies(&step(&["benchmark"]), &triplet));

        let other: Triplet = "x64-linux-dynamic".parse().unwrap();
        assert!(!loaded.satisfies(&step(&[]), &other));

        std::fs::remove_dir_all(&install).unwrap();
        assert!(!loaded.satisfies(&step(&[]), &triplet));
    }

    #[test]
    fn test_corrupt_marker_is_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("zlib.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(InstallMarker::load(&path).is_none());
        assert!(InstallMarker::load(&tmp.path().join("missing.json")).is_none());
    }
}
