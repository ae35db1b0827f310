//! `berth build` command

use anyhow::Result;

use super::{build_options, configure_project};
use crate::cli::BuildArgs;
use berth::ops;
use berth::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: BuildArgs) -> Result<()> {
    let configured = configure_project(gctx, &args.project)?;
    let options = build_options(gctx, &configured, &args.project);

    let artifacts = ops::build(&configured, &options).into_result()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
    } else {
        for artifact in artifacts.iter() {
            eprintln!(
                "    Artifact {} ({}): {}",
                artifact.component,
                artifact.kind,
                artifact.path.display()
            );
        }
    }

    Ok(())
}
