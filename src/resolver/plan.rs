//! Install plans.
//!
//! An [`InstallPlan`] is the resolver's output: every package of the
//! transitive closure with its selected version and unioned feature set, in
//! dependency-first order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use semver::Version;
use serde::Serialize;

use crate::core::{PortSummary, ResolvedPackage, Triplet};
use crate::util::hash::feature_set_hash;

/// One package to install.
#[derive(Debug, Clone)]
pub struct PlannedInstall {
    pub port: PortSummary,

    /// Union of the features every requester asked for
    pub features: BTreeSet<String>,

    /// Names of the packages this one depends on
    pub dependencies: Vec<String>,
}

impl PlannedInstall {
    pub fn name(&self) -> &str {
        &self.port.name
    }

    pub fn version(&self) -> &Version {
        &self.port.version
    }

    pub fn feature_hash(&self) -> String {
        feature_set_hash(&self.features)
    }

    /// The package as it looks once installed under `install_root`.
    pub fn package(&self, install_root: &Path, triplet: &Triplet) -> ResolvedPackage {
        ResolvedPackage {
            name: self.port.name.clone(),
            version: self.port.version.clone(),
            triplet: triplet.clone(),
            install_path: ResolvedPackage::install_path_for(
                install_root,
                triplet,
                &self.port.name,
                &self.port.version,
            ),
            exports: self.port.exports.clone(),
            features: self.features.clone(),
        }
    }
}

/// Dependency-first list of packages to install for one triplet.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    triplet: Triplet,
    steps: Vec<PlannedInstall>,
}

#[derive(Serialize)]
struct PlanEntry<'a> {
    name: &'a str,
    version: String,
    features: &'a BTreeSet<String>,
    dependencies: &'a [String],
}

#[derive(Serialize)]
struct PlanView<'a> {
    triplet: String,
    packages: Vec<PlanEntry<'a>>,
}

impl InstallPlan {
    /// Steps must already be dependency-first.
    pub fn new(triplet: Triplet, steps: Vec<PlannedInstall>) -> Self {
        InstallPlan { triplet, steps }
    }

    pub fn triplet(&self) -> &Triplet {
        &self.triplet
    }

    pub fn steps(&self) -> &[PlannedInstall] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PlannedInstall> {
        self.steps.iter().find(|s| s.name() == name)
    }

    /// Package names in install order.
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(PlannedInstall::name).collect()
    }

    /// Group step indices into waves: every step's dependencies sit in an
    /// earlier wave, so steps inside one wave can install concurrently.
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let index: BTreeMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name(), i))
            .collect();

        let mut level = vec![0usize; self.steps.len()];
        for (i, step) in self.steps.iter().enumerate() {
            let wave = step
                .dependencies
                .iter()
                .filter_map(|d| index.get(d.as_str()))
                .map(|&d| level[d] + 1)
                .max()
                .unwrap_or(0);
            level[i] = wave;
        }

        let depth = level.iter().copied().max().map_or(0, |m| m + 1);
        let mut waves = vec![Vec::new(); depth];
        for (i, l) in level.into_iter().enumerate() {
            waves[l].push(i);
        }
        waves
    }

    /// Every planned package as installed under `install_root`.
    pub fn packages(&self, install_root: &Path) -> Vec<ResolvedPackage> {
        self.steps
            .iter()
            .map(|s| s.package(install_root, &self.triplet))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let view = PlanView {
            triplet: self.triplet.to_string(),
            packages: self
                .steps
                .iter()
                .map(|s| PlanEntry {
                    name: s.name(),
                    version: s.version().to_string(),
                    features: &s.features,
                    dependencies: &s.dependencies,
                })
                .collect(),
        };
        serde_json::to_string_pretty(&view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, deps: &[&str]) -> PlannedInstall {
        PlannedInstall {
            port: PortSummary::new(name, Version::new(1, 0, 0)),
            features: BTreeSet::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_waves_respect_dependencies() {
        let plan = InstallPlan::new(
            "x64-linux".parse().unwrap(),
            vec![
                step("ncurses", &[]),
                step("zlib", &[]),
                step("editline", &["ncurses"]),
                step("png", &["zlib", "editline"]),
            ],
        );

        assert_eq!(plan.waves(), vec![vec![0, 1], vec![2], vec![3]]);
        assert_eq!(plan.order(), vec!["ncurses", "zlib", "editline", "png"]);
    }

    #[test]
    fn test_packages_use_triplet_layout() {
        let plan = InstallPlan::new("x64-linux".parse().unwrap(), vec![step("zlib", &[])]);
        let pkgs = plan.packages(Path::new("/inst"));
        assert_eq!(
            pkgs[0].install_path,
            Path::new("/inst/x64-linux/zlib-1.0.0")
        );
    }

    #[test]
    fn test_json_view() {
        let plan = InstallPlan::new("x64-linux".parse().unwrap(), vec![step("zlib", &[])]);
        let json = plan.to_json().unwrap();
        assert!(json.contains("\"triplet\": \"x64-linux\""));
        assert!(json.contains("\"version\": \"1.0.0\""));
    }
}
