//! `berth export` command

use anyhow::Result;

use super::{build_options, configure_project};
use crate::cli::ExportArgs;
use berth::export::descriptor_path;
use berth::ops;
use berth::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: ExportArgs) -> Result<()> {
    let configured = configure_project(gctx, &args.project)?;
    let options = build_options(gctx, &configured, &args.project);

    let prefix = match args.prefix {
        Some(prefix) => gctx.cwd().join(prefix),
        None => ops::default_prefix(configured.project_root()),
    };
    let descriptor = ops::build_and_export(&configured, &options, Some(&prefix))?;

    for component in &descriptor.components {
        match &component.artifact {
            Some(path) => eprintln!("   Installed {} -> {}", component.id, path.display()),
            None => eprintln!("    Exported {} (interface)", component.id),
        }
    }
    eprintln!(
        "    Finished export of {} component(s) to {}",
        descriptor.components.len(),
        prefix.display()
    );
    println!(
        "{}",
        descriptor_path(&prefix, configured.graph.namespace()).display()
    );

    Ok(())
}
