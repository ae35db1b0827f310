//! `berth resolve` command

use anyhow::{Context, Result};

use super::project_root;
use crate::cli::ResolveArgs;
use berth::core::Triplet;
use berth::ops::{resolve_project, ResolveOptions};
use berth::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: ResolveArgs) -> Result<()> {
    let root = project_root(gctx, args.manifest_dir.as_deref())?;
    let triplet = args
        .triplet
        .as_deref()
        .map(str::parse::<Triplet>)
        .transpose()
        .context("invalid --triplet")?;

    let plan = resolve_project(
        gctx,
        &root,
        ResolveOptions {
            triplet,
            registry: args.registry,
        },
    )?;

    if args.json {
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    if plan.is_empty() {
        eprintln!("no dependencies to resolve for {}", plan.triplet());
    }
    for step in plan.steps() {
        let mut line = format!("{} {}", step.name(), step.version());
        if !step.features.is_empty() {
            let features: Vec<&str> = step.features.iter().map(String::as_str).collect();
            line.push_str(&format!(" [{}]", features.join(", ")));
        }
        println!("{}", line);
    }
    Ok(())
}
