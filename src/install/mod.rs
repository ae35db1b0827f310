//! Applying install plans.
//!
//! Every package is installed under its triplet's tree:
//!
//! ```text
//! <install-root>/<triplet>/<name>-<version>/      package contents
//! <install-root>/<triplet>/.berth/markers/<name>.json
//! <install-root>/<triplet>/.berth/locks/<name>-<version>.lock
//! <install-root>/<triplet>/.berth/staging/          in-progress installs
//! ```
//!
//! A package whose marker matches the plan is reused without touching the
//! disk. Otherwise the port is built into a staging directory, moved into
//! place, and only then is the marker written. Independent packages install
//! concurrently, one dependency wave at a time.

mod lock;
mod marker;
mod port_builder;

pub use lock::InstallLock;
pub use marker::InstallMarker;
pub use port_builder::{CommandPortBuilder, PortBuildRequest, PortBuilder};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rayon::prelude::*;
use semver::Version;
use thiserror::Error;

use crate::core::{ResolvedPackage, Triplet};
use crate::resolver::{InstallPlan, PlannedInstall};
use crate::util::diagnostic::Diagnostic;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};

/// How long a contender waits for another install of the same package.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Error while installing packages.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum InstallError {
    #[error("install of `{package}` failed at {}: {message}", .path.display())]
    #[diagnostic(code(berth::install::io))]
    InstallIOFailure {
        package: String,
        path: PathBuf,
        message: String,
    },

    #[error("port build for `{package} {version}` failed: {message}")]
    #[diagnostic(code(berth::install::port_build))]
    PortBuildFailed {
        package: String,
        version: String,
        message: String,
    },

    #[error("timed out waiting for install lock on `{package}` ({})", .lock.display())]
    #[diagnostic(code(berth::install::lock_timeout))]
    LockTimeout { package: String, lock: PathBuf },
}

impl InstallError {
    pub fn io(package: &str, path: &Path, err: impl fmt::Display) -> Self {
        InstallError::InstallIOFailure {
            package: package.to_string(),
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            InstallError::InstallIOFailure { path, .. } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion("Check permissions and free space under the install root"),
            InstallError::PortBuildFailed { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Run with --verbose to see the port build output"),
            InstallError::LockTimeout { lock, .. } => Diagnostic::error(self.to_string())
                .with_context("another berth process may still be installing this package")
                .with_suggestion(format!(
                    "Remove {} if no other install is running",
                    lock.display()
                )),
        }
    }
}

/// Paths of one triplet's install tree.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
    triplet: Triplet,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>, triplet: Triplet) -> Self {
        InstallLayout {
            root: root.into(),
            triplet,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn triplet(&self) -> &Triplet {
        &self.triplet
    }

    pub fn triplet_dir(&self) -> PathBuf {
        self.triplet.install_dir(&self.root)
    }

    fn state_dir(&self) -> PathBuf {
        self.triplet_dir().join(".berth")
    }

    pub fn markers_dir(&self) -> PathBuf {
        self.state_dir().join("markers")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir().join("locks")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.state_dir().join("staging")
    }

    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.markers_dir().join(format!("{}.json", name))
    }

    pub fn lock_path(&self, name: &str, version: &Version) -> PathBuf {
        self.locks_dir()
            .join(format!("{}.lock", ResolvedPackage::dir_name(name, version)))
    }

    /// Packages with a live marker in this triplet's tree, sorted by name.
    pub fn installed(&self) -> Vec<ResolvedPackage> {
        installed_in(&self.triplet_dir(), &self.triplet)
    }

    pub fn package_dir(&self, name: &str, version: &Version) -> PathBuf {
        ResolvedPackage::install_path_for(&self.root, &self.triplet, name, version)
    }
}

/// What happened to each package of a plan.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Packages built and moved into place by this run
    pub installed: Vec<ResolvedPackage>,

    /// Packages whose marker already matched
    pub reused: Vec<ResolvedPackage>,

    /// Every package of the plan, in install order
    pub packages: Vec<ResolvedPackage>,
}

impl InstallReport {
    pub fn is_noop(&self) -> bool {
        self.installed.is_empty()
    }
}

enum Outcome {
    Installed,
    Reused,
}

/// Applies install plans under an install root.
pub struct Installer<'a> {
    root: PathBuf,
    builder: &'a dyn PortBuilder,
    jobs: Option<usize>,
    lock_timeout: Duration,
}

impl<'a> Installer<'a> {
    pub fn new(root: impl Into<PathBuf>, builder: &'a dyn PortBuilder) -> Self {
        Installer {
            root: root.into(),
            builder,
            jobs: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Install every package of `plan` that is not already installed.
    pub fn apply(&self, plan: &InstallPlan) -> Result<InstallReport, InstallError> {
        let layout = InstallLayout::new(&self.root, plan.triplet().clone());
        let packages = plan.packages(&self.root);
        let mut report = InstallReport {
            packages: packages.clone(),
            ..Default::default()
        };

        if plan.is_empty() {
            return Ok(report);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.unwrap_or(0))
            .build()
            .map_err(|e| InstallError::io("<thread pool>", &self.root, e))?;

        for wave in plan.waves() {
            let results: Vec<Result<Outcome, InstallError>> = pool.install(|| {
                wave.par_iter()
                    .map(|&i| self.install_one(&layout, plan, &packages, &plan.steps()[i]))
                    .collect()
            });

            for (&i, result) in wave.iter().zip(results) {
                match result? {
                    Outcome::Installed => report.installed.push(packages[i].clone()),
                    Outcome::Reused => report.reused.push(packages[i].clone()),
                }
            }
        }

        tracing::info!(
            "{} package(s) installed, {} up to date",
            report.installed.len(),
            report.reused.len()
        );
        Ok(report)
    }

    fn install_one(
        &self,
        layout: &InstallLayout,
        plan: &InstallPlan,
        packages: &[ResolvedPackage],
        step: &PlannedInstall,
    ) -> Result<Outcome, InstallError> {
        let name = step.name();
        let triplet = layout.triplet();
        let marker_path = layout.marker_path(name);

        let previous = InstallMarker::load(&marker_path);
        if previous.as_ref().is_some_and(|m| m.satisfies(step, triplet)) {
            tracing::debug!("{} {} is up to date", name, step.version());
            return Ok(Outcome::Reused);
        }

        let _lock = InstallLock::acquire(
            name,
            &layout.lock_path(name, step.version()),
            self.lock_timeout,
        )?;

        // a contender may have finished while we waited
        let previous = InstallMarker::load(&marker_path);
        if previous.as_ref().is_some_and(|m| m.satisfies(step, triplet)) {
            return Ok(Outcome::Reused);
        }

        tracing::info!("installing {} {} for {}", name, step.version(), triplet);

        let staging_root = layout.staging_dir();
        ensure_dir(&staging_root).map_err(|e| InstallError::io(name, &staging_root, e))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}-", name))
            .tempdir_in(&staging_root)
            .map_err(|e| InstallError::io(name, &staging_root, e))?;

        let dependencies: Vec<ResolvedPackage> = packages
            .iter()
            .filter(|p| step.dependencies.iter().any(|d| d == &p.name))
            .cloned()
            .collect();

        self.builder
            .build(&PortBuildRequest {
                step,
                triplet,
                staging_dir: staging.path(),
                dependencies: &dependencies,
            })
            .map_err(|e| InstallError::PortBuildFailed {
                package: name.to_string(),
                version: step.version().to_string(),
                message: format!("{:#}", e),
            })?;

        let files = walkdir::WalkDir::new(staging.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .count();

        // drop a stale tree from a previous version or feature set
        if let Some(old) = &previous {
            if old.install_path != layout.package_dir(name, step.version()) {
                remove_dir_all_if_exists(&old.install_path)
                    .map_err(|e| InstallError::io(name, &old.install_path, e))?;
            }
        }

        let dest = step.package(layout.root(), plan.triplet()).install_path;
        remove_dir_all_if_exists(&dest).map_err(|e| InstallError::io(name, &dest, e))?;
        std::fs::rename(staging.path(), &dest).map_err(|e| InstallError::io(name, &dest, e))?;

        InstallMarker::for_step(step, triplet, dest.clone(), files)
            .write(&marker_path)
            .map_err(|e| InstallError::io(name, &marker_path, format!("{:#}", e)))?;

        tracing::debug!("installed {} file(s) to {}", files, dest.display());
        Ok(Outcome::Installed)
    }
}

/// Packages recorded in the install tree `triplet_dir` for `triplet`.
///
/// Markers for another triplet or whose install directory is gone are
/// skipped. A missing tree yields nothing.
pub fn installed_in(triplet_dir: &Path, triplet: &Triplet) -> Vec<ResolvedPackage> {
    let markers = triplet_dir.join(".berth").join("markers");
    if !markers.is_dir() {
        return Vec::new();
    }
    walkdir::WalkDir::new(&markers)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|e| InstallMarker::load(e.path()))
        .filter(|m| &m.triplet == triplet && m.install_path.is_dir())
        .map(|m| m.to_package())
        .collect()
}
