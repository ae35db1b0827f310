//! Implementation of `berth resolve`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::{DirectoryIndex, Manifest, Triplet, MANIFEST_NAME};
use crate::resolver::{self, InstallPlan};
use crate::toolchain::select_triplet;
use crate::util::context::GlobalContext;

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub triplet: Option<Triplet>,
    pub registry: Option<PathBuf>,
}

/// Resolve the project's dependencies without installing anything.
pub fn resolve_project(
    gctx: &GlobalContext,
    source_root: &Path,
    options: ResolveOptions,
) -> Result<InstallPlan> {
    let manifest = Manifest::load(&source_root.join(MANIFEST_NAME))?;
    let config = gctx.load_config(source_root);

    let explicit = match options.triplet {
        Some(triplet) => Some(triplet),
        None => config.triplet()?,
    };
    let (triplet, source) = select_triplet(explicit, |key| std::env::var(key).ok())?;
    tracing::debug!("resolving for {} ({})", triplet, source);

    if manifest.dependencies()?.is_empty() {
        return Ok(InstallPlan::new(triplet, Vec::new()));
    }

    let Some(registry) = options
        .registry
        .or_else(|| config.registry.path.clone().map(|p| source_root.join(p)))
    else {
        bail!(
            "`{}` declares dependencies but no package registry is configured; \
             set `registry.path` in config or pass --registry",
            manifest.name()
        );
    };

    resolver::resolve(&manifest, &DirectoryIndex::new(registry), &triplet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveError;
    use tempfile::TempDir;

    fn port(registry: &Path, name: &str, version: &str, body: &str) {
        let dir = registry.join(&name[..1]).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.toml", version)),
            format!(
                "[package]\nname = \"{}\"\nversion = \"{}\"\n{}",
                name, version, body
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_resolve_project_from_directory_index() {
        let tmp = TempDir::new().unwrap();
        let registry = tmp.path().join("ports");
        port(&registry, "fmt", "9.1.0", "");
        port(&registry, "fmt", "10.2.1", "");
        port(&registry, "spdlog", "1.12.0", "dependencies = [\"fmt\"]\n");

        std::fs::write(
            tmp.path().join(MANIFEST_NAME),
            "[package]\nname = \"app\"\nversion = \"0.1.0\"\ndependencies = [\"spdlog\"]\n",
        )
        .unwrap();

        let gctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_home(tmp.path().join("home"));
        let plan = resolve_project(
            &gctx,
            tmp.path(),
            ResolveOptions {
                triplet: Some("x64-linux".parse().unwrap()),
                registry: Some(registry),
            },
        )
        .unwrap();

        assert_eq!(plan.order(), vec!["fmt", "spdlog"]);
        assert_eq!(plan.get("fmt").unwrap().version().to_string(), "10.2.1");
    }

    #[test]
    fn test_resolve_project_version_conflict() {
        let tmp = TempDir::new().unwrap();
        let registry = tmp.path().join("ports");
        port(&registry, "fmt", "9.1.0", "");
        port(&registry, "fmt", "10.2.1", "");
        port(
            &registry,
            "spdlog",
            "1.12.0",
            "dependencies = [{ name = \"fmt\", version = \"^10\" }]\n",
        );

        std::fs::write(
            tmp.path().join(MANIFEST_NAME),
            "[package]\nname = \"app\"\nversion = \"0.1.0\"\n\
             dependencies = [\"spdlog\", { name = \"fmt\", version = \"^9\" }]\n",
        )
        .unwrap();

        let gctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_home(tmp.path().join("home"));
        let err = resolve_project(
            &gctx,
            tmp.path(),
            ResolveOptions {
                triplet: Some("x64-linux".parse().unwrap()),
                registry: Some(registry),
            },
        )
        .unwrap_err();

        match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::VersionConflict { package, .. }) => assert_eq!(package, "fmt"),
            other => panic!("expected a version conflict, got {:?}", other),
        }
    }
}
