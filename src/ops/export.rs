//! Implementation of `berth export`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::{Artifacts, BuildOptions};
use crate::export::{self, ExportDescriptor};
use crate::ops::{build, Configured};

/// Default install prefix of a project.
pub fn default_prefix(project_root: &Path) -> PathBuf {
    project_root.join("install")
}

/// Export already-built artifacts under `prefix`.
pub fn export_artifacts(
    configured: &Configured,
    artifacts: &Artifacts,
    prefix: Option<&Path>,
) -> Result<ExportDescriptor> {
    let prefix = prefix
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_prefix(configured.project_root()));
    export::export(&configured.graph, artifacts, &prefix)
}

/// Build the project and export it.
pub fn build_and_export(
    configured: &Configured,
    build_options: &BuildOptions,
    prefix: Option<&Path>,
) -> Result<ExportDescriptor> {
    let artifacts = build(configured, build_options).into_result()?;
    export_artifacts(configured, &artifacts, prefix)
}
