//! Build executor with progress reporting.
//!
//! Components are built in dependency waves on a bounded rayon pool. A
//! component that fails takes its transitive dependents with it; they are
//! reported as skipped. Independent components keep building.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use crate::builder::errors::{BuildError, BuildFailure, SkippedComponent};
use crate::builder::graph::BuildGraph;
use crate::builder::toolchain::{ArchiveInput, CommandSpec, CompileInput, LinkInput, Toolchain};
use crate::core::{ComponentKind, Language, TestProtocol};
use crate::util::fs::ensure_dir;

/// Executor settings.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Parallel jobs; host parallelism when unset
    pub jobs: Option<usize>,

    /// Print every command instead of a progress bar
    pub verbose: bool,
}

/// A built output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub component: String,
    pub kind: ComponentKind,
    pub path: PathBuf,

    /// Set for test binaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_protocol: Option<TestProtocol>,
}

/// Artifacts of one build, in component declaration order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Artifacts(Vec<Artifact>);

impl Artifacts {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Artifacts(artifacts)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.0.iter()
    }

    pub fn get(&self, component: &str) -> Option<&Artifact> {
        self.0.iter().find(|a| a.component == component)
    }

    /// Test binaries only.
    pub fn tests(&self) -> impl Iterator<Item = &Artifact> {
        self.0.iter().filter(|a| a.kind == ComponentKind::Test)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of executing a build graph.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub artifacts: Artifacts,
    pub failures: Vec<BuildFailure>,
    pub skipped: Vec<SkippedComponent>,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<Artifacts, BuildError> {
        if self.failures.is_empty() {
            Ok(self.artifacts)
        } else {
            Err(BuildError::CompileFailure {
                failures: self.failures,
                skipped: self.skipped,
            })
        }
    }
}

/// Builds every component of a graph.
pub struct Executor<'a> {
    graph: &'a BuildGraph,
    toolchain: &'a dyn Toolchain,
    options: BuildOptions,
}

impl<'a> Executor<'a> {
    pub fn new(graph: &'a BuildGraph, toolchain: &'a dyn Toolchain, options: BuildOptions) -> Self {
        Executor {
            graph,
            toolchain,
            options,
        }
    }

    pub fn execute(&self) -> BuildOutcome {
        let start = Instant::now();
        let total = self.graph.len();
        let pb = self.progress_bar(total);

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.unwrap_or(0))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!("failed to start build pool, building serially: {}", e);
                None
            }
        };

        let mut outcome = BuildOutcome::default();
        let mut built: BTreeMap<usize, Artifact> = BTreeMap::new();
        // component -> failed dependency that blocks it
        let mut blocked: BTreeMap<usize, String> = BTreeMap::new();

        for wave in self.graph.waves() {
            let (ready, held): (Vec<usize>, Vec<usize>) =
                wave.into_iter().partition(|i| !blocked.contains_key(i));

            for i in held {
                let name = self.graph.component(i).name().to_string();
                tracing::debug!("skipping `{}`", name);
                outcome.skipped.push(SkippedComponent {
                    component: name,
                    failed_dependency: blocked[&i].clone(),
                });
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            }

            let build_wave = || -> Vec<(usize, Result<Option<Artifact>>)> {
                ready
                    .par_iter()
                    .map(|&i| {
                        let result = self.build_component(i);
                        if let Some(pb) = &pb {
                            pb.inc(1);
                        }
                        (i, result)
                    })
                    .collect()
            };
            let results = match &pool {
                Some(pool) => pool.install(build_wave),
                None => build_wave(),
            };

            for (i, result) in results {
                let name = self.graph.component(i).name().to_string();
                match result {
                    Ok(Some(artifact)) => {
                        built.insert(i, artifact);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!("`{}` failed: {:#}", name, e);
                        for dependent in self.graph.dependents_of(i) {
                            blocked.entry(dependent).or_insert_with(|| name.clone());
                        }
                        outcome.failures.push(BuildFailure {
                            component: name,
                            message: format!("{:#}", e),
                        });
                    }
                }
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        outcome.failures.sort_by(|a, b| a.component.cmp(&b.component));
        outcome.artifacts = Artifacts::new(built.into_values().collect());
        if outcome.is_success() {
            eprintln!(
                "    Finished {} target(s) in {:.2}s",
                outcome.artifacts.len(),
                start.elapsed().as_secs_f64()
            );
        }
        outcome
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if self.options.verbose || total <= 1 {
            return None;
        }
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let pb = ProgressBar::new(total as u64);
        pb.set_style(style);
        pb.set_message("building");
        Some(pb)
    }

    fn run(&self, spec: &CommandSpec, what: &str) -> Result<()> {
        let cmd = spec.to_process();
        if self.options.verbose {
            eprintln!("     Running {}", cmd.display_command());
        }
        tracing::debug!("{}: {}", what, cmd.display_command());

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} failed ({})\n{}", what, output.status, stderr.trim_end());
        }
        Ok(())
    }

    fn build_component(&self, index: usize) -> Result<Option<Artifact>> {
        let component = self.graph.component(index);
        let Some(output) = self.graph.artifact_path(index) else {
            return Ok(None);
        };

        ensure_dir(&self.graph.object_dir(index))?;
        let objects = component
            .sources()
            .par_iter()
            .map(|source| -> Result<PathBuf> {
                let language = Language::of_source(source).unwrap_or(component.language());
                let object = self.graph.object_path(index, source);
                if let Some(parent) = object.parent() {
                    ensure_dir(parent)?;
                }
                let spec = self.toolchain.compile_command(&CompileInput {
                    source: source.clone(),
                    output: object.clone(),
                    language,
                    flags: self.graph.compile_flags(index, language),
                });
                self.run(&spec, &format!("compiling {}", source.display()))?;
                Ok(object)
            })
            .collect::<Result<Vec<_>>>()?;

        match component.kind() {
            ComponentKind::Library => {
                // `ar rcs` appends to an existing archive
                if output.exists() {
                    std::fs::remove_file(&output)
                        .with_context(|| format!("failed to remove {}", output.display()))?;
                }
                let spec = self.toolchain.archive_command(&ArchiveInput {
                    objects,
                    output: output.clone(),
                });
                self.run(&spec, &format!("archiving {}", output.display()))?;
            }
            ComponentKind::Executable | ComponentKind::Test => {
                let closure = self.graph.closure(index);
                let cxx = component.language() == Language::Cxx
                    || closure
                        .link_artifacts
                        .iter()
                        .any(|&d| self.graph.component(d).language() == Language::Cxx);
                let spec = self.toolchain.link_exe_command(&LinkInput {
                    objects,
                    output: output.clone(),
                    language: if cxx { Language::Cxx } else { Language::C },
                    artifacts: self.graph.link_artifacts(index),
                    flags: self.graph.link_flags(index),
                });
                self.run(&spec, &format!("linking {}", output.display()))?;
            }
            ComponentKind::Interface => return Ok(None),
        }

        tracing::info!("built {} `{}`", component.kind(), component.name());
        Ok(Some(Artifact {
            component: component.name().to_string(),
            kind: component.kind(),
            path: output,
            test_protocol: (component.kind() == ComponentKind::Test)
                .then(|| component.test_protocol()),
        }))
    }
}
