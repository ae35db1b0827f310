//! Command implementations

pub mod build;
pub mod completions;
pub mod configure;
pub mod export;
pub mod resolve;
pub mod test;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::ProjectArgs;
use berth::builder::BuildOptions;
use berth::core::{BuildType, Triplet};
use berth::ops::{configure as ops_configure, ConfigureOptions, Configured};
use berth::GlobalContext;

/// Project root from `--manifest-dir` or the nearest manifest.
pub fn project_root(gctx: &GlobalContext, manifest_dir: Option<&Path>) -> Result<PathBuf> {
    match manifest_dir {
        Some(dir) => Ok(gctx.cwd().join(dir)),
        None => gctx.find_project_root(),
    }
}

/// Configure the project selected by `args`.
pub fn configure_project(gctx: &GlobalContext, args: &ProjectArgs) -> Result<Configured> {
    let root = project_root(gctx, args.manifest_dir.as_deref())?;

    let build_type = if args.release {
        Some(BuildType::Release)
    } else {
        args.build_type.as_deref().map(str::parse::<BuildType>).transpose()?
    };
    let triplet = args
        .triplet
        .as_deref()
        .map(str::parse::<Triplet>)
        .transpose()
        .context("invalid --triplet")?;

    ops_configure(
        gctx,
        &root,
        ConfigureOptions {
            build_type,
            triplet,
            install_root: args.install_root.clone(),
            registry: args.registry.clone(),
            build_dir: args.build_dir.clone(),
            search_paths: args.search_paths.clone(),
            jobs: args.jobs,
            ..Default::default()
        },
    )
}

pub fn build_options(gctx: &GlobalContext, configured: &Configured, args: &ProjectArgs) -> BuildOptions {
    BuildOptions {
        jobs: args.jobs.or(configured.config.build.jobs),
        verbose: gctx.is_verbose(),
    }
}
