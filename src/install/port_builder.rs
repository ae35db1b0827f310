//! Producing a package's install tree.
//!
//! Fetching and building third-party sources is delegated through
//! [`PortBuilder`]. The installer hands the builder an empty staging
//! directory; whatever the builder leaves there becomes the package's
//! install tree.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::{ResolvedPackage, Triplet};
use crate::resolver::PlannedInstall;
use crate::util::fs::{copy_dir_all, ensure_dir};
use crate::util::process::ProcessBuilder;

/// Everything a port builder gets to work with.
pub struct PortBuildRequest<'a> {
    pub step: &'a PlannedInstall,
    pub triplet: &'a Triplet,

    /// Empty directory to populate
    pub staging_dir: &'a Path,

    /// Already installed dependencies of this package
    pub dependencies: &'a [ResolvedPackage],
}

/// Produces install trees for ports.
pub trait PortBuilder: Send + Sync {
    fn build(&self, request: &PortBuildRequest<'_>) -> Result<()>;
}

/// Stages the port's `files/` directory, then runs its build command.
///
/// The command runs in the port directory with these variables set:
/// `BERTH_INSTALL_DIR` (the staging directory), `BERTH_TRIPLET`,
/// `BERTH_PACKAGE`, `BERTH_VERSION`, `BERTH_FEATURES` (comma separated) and
/// `BERTH_PREFIX_PATH` (dependency install paths).
#[derive(Debug, Default, Clone)]
pub struct CommandPortBuilder;

impl CommandPortBuilder {
    pub fn new() -> Self {
        CommandPortBuilder
    }
}

impl PortBuilder for CommandPortBuilder {
    fn build(&self, request: &PortBuildRequest<'_>) -> Result<()> {
        let port = &request.step.port;
        let staging = request.staging_dir;

        if let Some(files) = port.port_dir.as_ref().map(|d| d.join("files")) {
            if files.is_dir() {
                let count = copy_dir_all(&files, staging)?;
                tracing::debug!("staged {} file(s) for {}", count, port.name);
            }
        }

        if let Some(command) = &port.build_command {
            let Some((program, args)) = command.split_first() else {
                bail!("port `{}` has an empty build command", port.name);
            };

            let prefix_path = std::env::join_paths(
                request.dependencies.iter().map(|d| d.install_path.as_path()),
            )
            .context("dependency install path contains a path separator")?;

            let mut cmd = ProcessBuilder::new(program)
                .args(args)
                .env("BERTH_INSTALL_DIR", staging.to_string_lossy())
                .env("BERTH_TRIPLET", request.triplet.to_string())
                .env("BERTH_PACKAGE", &port.name)
                .env("BERTH_VERSION", port.version.to_string())
                .env(
                    "BERTH_FEATURES",
                    request
                        .step
                        .features
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(","),
                )
                .env("BERTH_PREFIX_PATH", prefix_path.to_string_lossy());
            if let Some(dir) = port.port_dir.as_ref().filter(|d| d.is_dir()) {
                cmd = cmd.cwd(dir);
            } else {
                cmd = cmd.cwd(staging);
            }

            tracing::debug!("running port build: {}", cmd.display_command());
            let output = cmd.exec()?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "build command for `{} {}` failed ({}):\n{}",
                    port.name,
                    port.version,
                    output.status,
                    stderr.trim_end()
                );
            }
        }

        ensure_dir(&staging.join("include"))?;
        ensure_dir(&staging.join("lib"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PortSummary;
    use semver::Version;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn step(port: PortSummary) -> PlannedInstall {
        PlannedInstall {
            port,
            features: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_stages_files_dir() {
        let tmp = TempDir::new().unwrap();
        let port_dir = tmp.path().join("ports/z/zlib/1.3.0");
        std::fs::create_dir_all(port_dir.join("files/include")).unwrap();
        std::fs::write(port_dir.join("files/include/zlib.h"), "/* zlib */").unwrap();

        let mut summary = PortSummary::new("zlib", Version::new(1, 3, 0));
        summary.port_dir = Some(port_dir);
        let step = step(summary);

        let staging = tmp.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let triplet: Triplet = "x64-linux".parse().unwrap();

        CommandPortBuilder::new()
            .build(&PortBuildRequest {
                step: &step,
                triplet: &triplet,
                staging_dir: &staging,
                dependencies: &[],
            })
            .unwrap();

        assert!(staging.join("include/zlib.h").is_file());
        assert!(staging.join("lib").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_build_command() {
        let tmp = TempDir::new().unwrap();
        let mut summary = PortSummary::new("editline", Version::new(1, 17, 1));
        summary.build_command = Some(vec![
            "sh".into(),
            "-c".into(),
            "mkdir -p \"$BERTH_INSTALL_DIR/lib\" && echo \"$BERTH_TRIPLET\" > \"$BERTH_INSTALL_DIR/lib/built-for\"".into(),
        ]);
        let step = step(summary);
        let staging = tmp.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let triplet: Triplet = "x64-linux".parse().unwrap();

        CommandPortBuilder::new()
            .build(&PortBuildRequest {
                step: &step,
                triplet: &triplet,
                staging_dir: &staging,
                dependencies: &[],
            })
            .unwrap();

        let built_for = std::fs::read_to_string(staging.join("lib/built-for")).unwrap();
        assert_eq!(built_for.trim(), "x64-linux");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_package() {
        let tmp = TempDir::new().unwrap();
        let mut summary = PortSummary::new("broken", Version::new(0, 1, 0));
        summary.build_command = Some(vec!["sh".into(), "-c".into(), "echo nope >&2; exit 3".into()]);
        let step = step(summary);
        let triplet: Triplet = "x64-linux".parse().unwrap();

        let err = CommandPortBuilder::new()
            .build(&PortBuildRequest {
                step: &step,
                triplet: &triplet,
                staging_dir: tmp.path(),
                dependencies: &[],
            })
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken 0.1.0"));
        assert!(message.contains("nope"));
    }
}
