//! Layered configuration.
//!
//! `<home>/config.toml` holds user-wide defaults and `.berth/config.toml`
//! in a project overrides them. Command-line flags override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{BuildType, Triplet};

/// Default per-test-case timeout.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 60;

/// berth configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
    pub install: InstallConfig,
    pub registry: RegistryConfig,
    pub test: TestConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Default number of parallel jobs (None = host parallelism)
    pub jobs: Option<usize>,

    /// Default build type (debug, release)
    pub build_type: Option<String>,

    /// Default triplet (e.g., x64-linux)
    pub triplet: Option<String>,

    /// Build output directory, relative to the project root
    pub build_dir: Option<PathBuf>,
}

/// Package install configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Root under which per-triplet install trees live
    pub root: Option<PathBuf>,
}

/// Port index configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to a local port index
    pub path: Option<PathBuf>,
}

/// Test runner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TestConfig {
    /// Per-case timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Read `path` if present. A malformed file is logged and ignored.
    fn load_if_present(path: &Path) -> Option<Self> {
        if !path.is_file() {
            return None;
        }
        match Self::load(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring config {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Layer `over` on top of `self`; every key set in `over` wins.
    pub fn merge(&mut self, over: Config) {
        let Config {
            build,
            install,
            registry,
            test,
        } = over;
        self.build.jobs = build.jobs.or(self.build.jobs);
        self.build.build_type = build.build_type.or(self.build.build_type.take());
        self.build.triplet = build.triplet.or(self.build.triplet.take());
        self.build.build_dir = build.build_dir.or(self.build.build_dir.take());
        self.install.root = install.root.or(self.install.root.take());
        self.registry.path = registry.path.or(self.registry.path.take());
        self.test.timeout_secs = test.timeout_secs.or(self.test.timeout_secs);
    }

    /// Parse the configured build type.
    pub fn build_type(&self) -> Result<Option<BuildType>> {
        self.build
            .build_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("invalid `build.build-type` in config")
    }

    /// Parse the configured triplet.
    pub fn triplet(&self) -> Result<Option<Triplet>> {
        self.build
            .triplet
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("invalid `build.triplet` in config")
    }

    /// Per-case test timeout.
    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test.timeout_secs.unwrap_or(DEFAULT_TEST_TIMEOUT_SECS))
    }
}

/// Global config overlaid by project config, over defaults. Missing files
/// contribute nothing.
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    [global_path, project_path]
        .into_iter()
        .filter_map(Config::load_if_present)
        .fold(Config::default(), |mut config, layer| {
            config.merge(layer);
            config
        })
}
