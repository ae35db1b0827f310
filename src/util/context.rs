//! Global context for berth operations.
//!
//! Provides centralized access to configuration paths and the environment.
//! The context is an explicit value handed to operations; nothing in the
//! library reads process-wide mutable state behind its back.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::{find_manifest, MANIFEST_NAME};
use crate::util::config::{load_config, Config};

/// Environment variable overriding the berth home directory.
pub const HOME_ENV: &str = "BERTH_HOME";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "berth", "berth"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,

    /// Home directory for global berth data
    home: PathBuf,

    verbose: bool,

    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .or_else(|| PROJECT_DIRS.as_ref().map(|d| d.data_dir().to_path_buf()))
            .unwrap_or_else(|| cwd.join(".berth").join("home"));

        GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        }
    }

    /// Override the home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Default root for per-triplet install trees.
    pub fn default_install_root(&self) -> PathBuf {
        self.home.join("installed")
    }

    /// Project configuration file path for a project root.
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".berth").join("config.toml")
    }

    /// Load merged global + project configuration.
    pub fn load_config(&self, project_root: &Path) -> Config {
        load_config(&self.config_path(), &Self::project_config_path(project_root))
    }

    /// Find `Berth.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf> {
        find_manifest(&self.cwd).with_context(|| {
            format!(
                "could not find `{}` in `{}` or any parent directory",
                MANIFEST_NAME,
                self.cwd.display()
            )
        })
    }

    /// Directory containing the nearest manifest.
    pub fn find_project_root(&self) -> Result<PathBuf> {
        let manifest = self.find_manifest()?;
        Ok(manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_manifest_upward() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&manifest, "[package]\nname = \"calc\"\nversion = \"0.1.0\"\n").unwrap();
        let nested = tmp.path().join("src/lib");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested);
        assert_eq!(ctx.find_manifest().unwrap(), manifest);
        assert_eq!(ctx.find_project_root().unwrap(), tmp.path());
    }

    #[test]
    fn test_find_manifest_missing() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        let err = ctx.find_manifest().unwrap_err();
        assert!(err.to_string().contains(MANIFEST_NAME));
    }

    #[test]
    fn test_paths_follow_home() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .with_home(tmp.path().join("home"));
        assert_eq!(ctx.config_path(), tmp.path().join("home/config.toml"));
        assert_eq!(ctx.default_install_root(), tmp.path().join("home/installed"));
    }
}
