//! `berth configure` command

use anyhow::Result;

use super::configure_project;
use crate::cli::ConfigureArgs;
use berth::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: ConfigureArgs) -> Result<()> {
    let configured = configure_project(gctx, &args.project)?;
    let injected = &configured.injected;
    let graph = &configured.graph;

    eprintln!(
        "  Configured {} v{} for {} ({})",
        configured.manifest.name(),
        configured.manifest.package.version,
        injected.triplet,
        injected.triplet_source
    );
    for package in &injected.report.installed {
        eprintln!("   Installed {} v{}", package.name, package.version);
    }
    for package in &injected.report.reused {
        eprintln!("       Fresh {} v{}", package.name, package.version);
    }

    for (i, component) in graph.components().iter().enumerate() {
        let id = graph
            .aliases()
            .iter()
            .find(|(_, name)| *name == component.name())
            .map(|(id, _)| id.to_string())
            .unwrap_or_default();
        let deps: Vec<&str> = graph
            .component_deps(i)
            .into_iter()
            .map(|d| graph.component(d).name())
            .collect();
        println!(
            "{:<24} {:<10} {:<28} {}",
            component.name(),
            component.kind().as_str(),
            id,
            deps.join(", ")
        );
    }

    Ok(())
}
