//! berth CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use berth::ops::{diagnostic_for, ExitClass};
use berth::util::diagnostic::emit;
use berth::GlobalContext;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    let default_filter = if cli.verbose { "berth=debug" } else { "berth=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        emit(&diagnostic_for(&e), color);
        std::process::exit(ExitClass::from_error(&e).code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut gctx = GlobalContext::new()?;
    gctx.set_verbose(cli.verbose);
    gctx.set_color(!cli.no_color);

    match cli.command {
        Commands::Configure(args) => commands::configure::execute(&gctx, args),
        Commands::Build(args) => commands::build::execute(&gctx, args),
        Commands::Test(args) => commands::test::execute(&gctx, args),
        Commands::Export(args) => commands::export::execute(&gctx, args),
        Commands::Resolve(args) => commands::resolve::execute(&gctx, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
