//! Implementation of `berth configure`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::{compose, BuildGraph, CcToolchain, ComposeOptions, Toolchain};
use crate::core::{BuildType, DirectoryIndex, Manifest, PortIndex, Triplet, MANIFEST_NAME};
use crate::install::{CommandPortBuilder, PortBuilder};
use crate::toolchain::{InjectedContext, RootConfig, ToolchainInjector};
use crate::util::config::Config;
use crate::util::context::GlobalContext;

/// Options for configuring a project.
///
/// Every field left unset falls back to configuration, then to a default.
#[derive(Default)]
pub struct ConfigureOptions {
    /// Compiler driver; detected from the environment when unset
    pub toolchain: Option<Box<dyn Toolchain>>,

    pub build_type: Option<BuildType>,

    /// Triplet override
    pub triplet: Option<Triplet>,

    /// Root of per-triplet install trees
    pub install_root: Option<PathBuf>,

    /// Local port index
    pub registry: Option<PathBuf>,

    /// Build output directory
    pub build_dir: Option<PathBuf>,

    /// Extra package search paths
    pub search_paths: Vec<PathBuf>,

    /// Builds ports during install; runs port commands when unset
    pub port_builder: Option<Box<dyn PortBuilder>>,

    pub jobs: Option<usize>,
}

/// A composed project ready to build.
pub struct Configured {
    pub manifest: Manifest,
    pub config: Config,
    pub graph: BuildGraph,
    pub toolchain: Box<dyn Toolchain>,
    pub injected: InjectedContext,
}

impl Configured {
    pub fn project_root(&self) -> &Path {
        self.graph.source_root()
    }
}

/// Resolve, install and compose the project rooted at `source_root`.
///
/// Fails before any graph exists if resolution, installation or composition
/// fails.
pub fn configure(
    gctx: &GlobalContext,
    source_root: &Path,
    options: ConfigureOptions,
) -> Result<Configured> {
    let manifest_path = source_root.join(MANIFEST_NAME);
    let manifest = Manifest::load(&manifest_path)?;
    let config = gctx.load_config(source_root);

    let build_type = match options.build_type {
        Some(build_type) => build_type,
        None => config.build_type()?.unwrap_or_default(),
    };
    let triplet = match options.triplet {
        Some(triplet) => Some(triplet),
        None => config.triplet()?,
    };

    let install_root = options
        .install_root
        .or_else(|| config.install.root.clone().map(|p| source_root.join(p)))
        .unwrap_or_else(|| gctx.default_install_root());
    let registry = options
        .registry
        .or_else(|| config.registry.path.clone().map(|p| source_root.join(p)));
    let index = registry.map(DirectoryIndex::new);

    let port_builder: Box<dyn PortBuilder> = options
        .port_builder
        .unwrap_or_else(|| Box::new(CommandPortBuilder::new()));

    let injected = ToolchainInjector::new(port_builder.as_ref())
        .apply(RootConfig {
            manifest: Some(&manifest),
            triplet,
            install_root,
            search_paths: options.search_paths,
            index: index.as_ref().map(|i| i as &dyn PortIndex),
            jobs: options.jobs.or(config.build.jobs),
        })
        .with_context(|| format!("failed to configure `{}`", manifest.name()))?;

    let build_dir = options
        .build_dir
        .or_else(|| config.build.build_dir.clone().map(|p| source_root.join(p)))
        .unwrap_or_else(|| source_root.join("build"))
        .join(injected.triplet.to_string())
        .join(build_type.as_str());

    let tree = manifest.declaration_tree(source_root)?;
    let graph = compose(
        &tree,
        &injected.packages,
        &ComposeOptions {
            namespace: manifest.namespace().to_string(),
            triplet: injected.triplet.clone(),
            build_type,
            build_dir,
        },
    )?;
    let toolchain: Box<dyn Toolchain> = match options.toolchain {
        Some(toolchain) => toolchain,
        None => Box::new(CcToolchain::detect()?),
    };
    tracing::debug!("toolchain: {}", toolchain.describe());

    tracing::info!(
        "configured `{}`: {} component(s), {} package(s), {} build",
        manifest.name(),
        graph.len(),
        injected.packages.len(),
        build_type
    );

    Ok(Configured {
        manifest,
        config,
        graph,
        toolchain,
        injected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ComposeError;
    use tempfile::TempDir;

    fn project(manifest: &str) -> (TempDir, GlobalContext) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), manifest).unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/lib.c"), "int one(void) { return 1; }\n").unwrap();
        let gctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .with_home(tmp.path().join("home"));
        (tmp, gctx)
    }

    fn options() -> ConfigureOptions {
        ConfigureOptions {
            toolchain: Some(Box::new(CcToolchain::new("cc", "c++", "ar"))),
            triplet: Some("x64-linux".parse().unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_configure_without_dependencies() {
        let (tmp, gctx) = project(
            r#"
[package]
name = "one"
version = "0.1.0"

[[component]]
name = "one"
kind = "library"
sources = ["src/*.c"]
"#,
        );

        let configured = configure(&gctx, tmp.path(), options()).unwrap();
        assert_eq!(configured.graph.len(), 1);
        assert_eq!(configured.graph.namespace(), "one");
        assert!(configured.injected.packages.is_empty());
        assert_eq!(
            configured.graph.build_dir(),
            tmp.path().join("build/x64-linux/debug")
        );
    }

    #[test]
    fn test_configure_fails_on_unknown_target() {
        let (tmp, gctx) = project(
            r#"
[package]
name = "one"
version = "0.1.0"

[[component]]
name = "one"
kind = "library"
sources = ["src/*.c"]
internal-deps = ["missing"]
"#,
        );

        let err = configure(&gctx, tmp.path(), options()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ComposeError>(),
            Some(ComposeError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_configure_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let gctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        assert!(configure(&gctx, tmp.path(), options()).is_err());
    }
}
