//! Toolchain injection.
//!
//! Runs before any build graph exists. Picks the triplet, makes the
//! triplet's install tree the first package search path, and, when the
//! project declares dependencies, resolves and installs them. Everything it
//! decides is returned in an [`InjectedContext`]; nothing is stored globally.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::triplet::{TRIPLET_ENV, VCPKG_TRIPLET_ENV};
use crate::core::{Manifest, PortIndex, ResolvedPackage, Triplet};
use crate::install::{installed_in, InstallReport, Installer, PortBuilder};
use crate::resolver::{self, InstallPlan};

/// Where the selected triplet came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripletSource {
    /// Explicit override (`--triplet` or config)
    Override,

    /// A default-triplet environment variable
    Environment(&'static str),

    /// Host auto-detection
    Host,
}

impl fmt::Display for TripletSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripletSource::Override => f.write_str("override"),
            TripletSource::Environment(var) => write!(f, "${}", var),
            TripletSource::Host => f.write_str("host"),
        }
    }
}

/// Pick the triplet: override, then environment, then host.
///
/// Empty environment values are ignored; a malformed one is an error.
pub fn select_triplet(
    explicit: Option<Triplet>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(Triplet, TripletSource)> {
    if let Some(triplet) = explicit {
        return Ok((triplet, TripletSource::Override));
    }

    for var in [TRIPLET_ENV, VCPKG_TRIPLET_ENV] {
        let Some(value) = env(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let triplet = value
            .trim()
            .parse()
            .with_context(|| format!("invalid triplet in ${}", var))?;
        return Ok((triplet, TripletSource::Environment(var)));
    }

    match Triplet::host() {
        Some(triplet) => Ok((triplet, TripletSource::Host)),
        None => bail!(
            "cannot detect a triplet for {}-{}; pass --triplet",
            std::env::consts::ARCH,
            std::env::consts::OS
        ),
    }
}

/// Input to [`ToolchainInjector::apply`].
pub struct RootConfig<'a> {
    pub manifest: Option<&'a Manifest>,

    /// Explicit triplet override
    pub triplet: Option<Triplet>,

    /// Root of per-triplet install trees
    pub install_root: PathBuf,

    /// Additional triplet install trees to search, lowest priority
    pub search_paths: Vec<PathBuf>,

    /// Port index; required when the manifest has dependencies
    pub index: Option<&'a dyn PortIndex>,

    pub jobs: Option<usize>,
}

/// Everything decided before composition.
#[derive(Debug, Clone)]
pub struct InjectedContext {
    pub triplet: Triplet,
    pub triplet_source: TripletSource,
    pub install_root: PathBuf,

    /// Triplet install trees searched for packages, highest priority first
    pub search_paths: Vec<PathBuf>,

    pub plan: InstallPlan,

    /// Packages composition may reference: the plan's in dependency order,
    /// then those found on the search paths
    pub packages: Vec<ResolvedPackage>,

    pub report: InstallReport,
}

impl InjectedContext {
    /// The triplet-scoped install tree.
    pub fn triplet_dir(&self) -> PathBuf {
        self.triplet.install_dir(&self.install_root)
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Selects the triplet and installs dependencies.
pub struct ToolchainInjector<'a> {
    builder: &'a dyn PortBuilder,
    env: EnvLookup,
}

impl<'a> ToolchainInjector<'a> {
    /// An injector reading the process environment.
    pub fn new(builder: &'a dyn PortBuilder) -> Self {
        ToolchainInjector {
            builder,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Select the triplet, then resolve and install the manifest's
    /// dependencies, blocking until the install plan is applied.
    pub fn apply(&self, root: RootConfig<'_>) -> Result<InjectedContext> {
        let (triplet, triplet_source) = select_triplet(root.triplet, &self.env)?;
        tracing::info!("using triplet {} ({})", triplet, triplet_source);

        let search_paths = prepend_unique(triplet.install_dir(&root.install_root), root.search_paths);

        let has_dependencies = match root.manifest {
            Some(manifest) => !manifest.dependencies()?.is_empty(),
            None => false,
        };

        let (plan, report) = match (root.manifest, root.index) {
            (Some(manifest), Some(index)) if has_dependencies => {
                let plan = resolver::resolve(manifest, index, &triplet)?;
                let report = Installer::new(&root.install_root, self.builder)
                    .jobs(root.jobs)
                    .apply(&plan)?;
                tracing::info!(
                    "{} package(s) installed, {} reused",
                    report.installed.len(),
                    report.reused.len()
                );
                (plan, report)
            }
            (Some(manifest), None) if has_dependencies => bail!(
                "`{}` declares dependencies but no package registry is configured; \
                 set `registry.path` in config or pass --registry",
                manifest.name()
            ),
            _ => (InstallPlan::new(triplet.clone(), Vec::new()), InstallReport::default()),
        };

        // Packages already installed on a search path are visible too; the
        // plan's own packages and earlier paths take precedence.
        let mut packages = report.packages.clone();
        for dir in &search_paths {
            for found in installed_in(dir, &triplet) {
                if packages.iter().all(|p| p.name != found.name) {
                    tracing::debug!(
                        "found {} {} in {}",
                        found.name,
                        found.version,
                        dir.display()
                    );
                    packages.push(found);
                }
            }
        }

        Ok(InjectedContext {
            packages,
            triplet,
            triplet_source,
            install_root: root.install_root,
            search_paths,
            plan,
            report,
        })
    }
}

fn prepend_unique(first: PathBuf, rest: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut paths = vec![first];
    for path in rest {
        if !paths.iter().any(|p: &PathBuf| same_path(p, &path)) {
            paths.push(path);
        }
    }
    paths
}

fn same_path(a: &Path, b: &Path) -> bool {
    a == b || matches!((a.canonicalize(), b.canonicalize()), (Ok(x), Ok(y)) if x == y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryIndex, PortSummary};
    use crate::install::PortBuildRequest;
    use semver::Version;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingBuilder {
        built: Mutex<Vec<String>>,
    }

    impl PortBuilder for CountingBuilder {
        fn build(&self, request: &PortBuildRequest<'_>) -> Result<()> {
            self.built
                .lock()
                .unwrap()
                .push(request.step.name().to_string());
            std::fs::create_dir_all(request.staging_dir.join("include")).unwrap();
            Ok(())
        }
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_triplet_precedence() {
        let explicit: Triplet = "arm64-osx".parse().unwrap();
        let lookup = env(&[
            (TRIPLET_ENV, "x64-windows-static"),
            (VCPKG_TRIPLET_ENV, "x86-windows"),
        ]);

        let (t, source) = select_triplet(Some(explicit.clone()), &lookup).unwrap();
        assert_eq!((t, source), (explicit, TripletSource::Override));

        let (t, source) = select_triplet(None, &lookup).unwrap();
        assert_eq!(t.to_string(), "x64-windows-static");
        assert_eq!(source, TripletSource::Environment(TRIPLET_ENV));

        let (t, source) = select_triplet(None, env(&[(TRIPLET_ENV, ""), (VCPKG_TRIPLET_ENV, "x86-windows")])).unwrap();
        assert_eq!(t.to_string(), "x86-windows");
        assert_eq!(source, TripletSource::Environment(VCPKG_TRIPLET_ENV));
    }

    #[test]
    fn test_host_fallback_and_invalid_env() {
        if let Some(host) = Triplet::host() {
            let (t, source) = select_triplet(None, env(&[])).unwrap();
            assert_eq!((t, source), (host, TripletSource::Host));
        }
        assert!(select_triplet(None, env(&[(TRIPLET_ENV, "nonsense")])).is_err());
    }

    #[test]
    fn test_search_path_prepended_once() {
        let tmp = TempDir::new().unwrap();
        let builder = CountingBuilder::default();
        let injector = ToolchainInjector::new(&builder).with_env(env(&[]));
        let triplet: Triplet = "x64-linux".parse().unwrap();
        let triplet_dir = triplet.install_dir(tmp.path());

        let ctx = injector
            .apply(RootConfig {
                manifest: None,
                triplet: Some(triplet),
                install_root: tmp.path().to_path_buf(),
                search_paths: vec![PathBuf::from("/opt/other"), triplet_dir.clone()],
                index: None,
                jobs: None,
            })
            .unwrap();

        assert_eq!(ctx.search_paths, vec![triplet_dir, PathBuf::from("/opt/other")]);
        assert!(ctx.plan.is_empty());
        assert!(ctx.packages.is_empty());
    }

    #[test]
    fn test_installs_dependencies_then_reuses() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::parse(
            r#"
[package]
name = "calc"
version = "0.1.0"
dependencies = ["catch2"]
"#,
        )
        .unwrap();

        let index = MemoryIndex::new().with(PortSummary::new("catch2", Version::new(3, 5, 2)));
        let builder = CountingBuilder::default();
        let injector = ToolchainInjector::new(&builder).with_env(env(&[]));
        let root = || RootConfig {
            manifest: Some(&manifest),
            triplet: Some("x64-linux".parse().unwrap()),
            install_root: tmp.path().to_path_buf(),
            search_paths: Vec::new(),
            index: Some(&index),
            jobs: Some(1),
        };

        let first = injector.apply(root()).unwrap();
        assert_eq!(first.report.installed.len(), 1);
        assert_eq!(first.packages[0].name, "catch2");

        let second = injector.apply(root()).unwrap();
        assert!(second.report.is_noop());
        assert_eq!(builder.built.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_search_path_packages_become_visible() {
        let tmp = TempDir::new().unwrap();
        let triplet: Triplet = "x64-linux".parse().unwrap();
        let index = MemoryIndex::new()
            .with(PortSummary::new("zlib", Version::new(1, 3, 0)).with_exports(["z"]));
        let plan = crate::resolver::Resolver::new(&index)
            .resolve("other", &[crate::core::DependencyDeclaration::new("zlib")], &triplet)
            .unwrap();
        let other_root = tmp.path().join("other");
        let builder = CountingBuilder::default();
        Installer::new(&other_root, &builder).apply(&plan).unwrap();

        let injector = ToolchainInjector::new(&builder).with_env(env(&[]));
        let root = |search_paths| RootConfig {
            manifest: None,
            triplet: Some(triplet.clone()),
            install_root: tmp.path().join("mine"),
            search_paths,
            index: None,
            jobs: None,
        };

        assert!(injector.apply(root(Vec::new())).unwrap().packages.is_empty());

        let ctx = injector
            .apply(root(vec![triplet.install_dir(&other_root)]))
            .unwrap();
        assert_eq!(ctx.packages.len(), 1);
        assert_eq!(ctx.packages[0].name, "zlib");
        assert_eq!(ctx.packages[0].exports, vec!["z"]);
        assert!(ctx.packages[0].install_path.starts_with(&other_root));
    }

    #[test]
    fn test_dependencies_without_registry() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::parse(
            "[package]\nname = \"calc\"\nversion = \"0.1.0\"\ndependencies = [\"catch2\"]\n",
        )
        .unwrap();
        let builder = CountingBuilder::default();

        let err = ToolchainInjector::new(&builder)
            .with_env(env(&[]))
            .apply(RootConfig {
                manifest: Some(&manifest),
                triplet: Some("x64-linux".parse().unwrap()),
                install_root: tmp.path().to_path_buf(),
                search_paths: Vec::new(),
                index: None,
                jobs: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("no package registry"));
    }
}
