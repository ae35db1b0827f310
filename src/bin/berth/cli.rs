//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// berth - dependency resolution and build-graph composition for C and C++
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and install dependencies, then compose the build graph
    Configure(ConfigureArgs),

    /// Build every component
    Build(BuildArgs),

    /// Build, then discover and run tests
    Test(TestArgs),

    /// Build and install components with an export descriptor
    Export(ExportArgs),

    /// Print the install plan without installing anything
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that configures the project.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project directory (defaults to the nearest Berth.toml)
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,

    /// Build with optimizations
    #[arg(short, long, conflicts_with = "build_type")]
    pub release: bool,

    /// Build type (debug, release)
    #[arg(long)]
    pub build_type: Option<String>,

    /// Target triplet (e.g. x64-linux)
    #[arg(long)]
    pub triplet: Option<String>,

    /// Root of per-triplet package install trees
    #[arg(long, env = "BERTH_INSTALL_ROOT")]
    pub install_root: Option<PathBuf>,

    /// Local port index
    #[arg(long, env = "BERTH_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Build output directory
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Triplet install tree to search for already installed packages (repeatable)
    #[arg(long = "search-path")]
    pub search_paths: Vec<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print built artifacts as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct TestArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Exact test name, `component/name`, or glob pattern
    pub filter: Option<String>,

    /// Per-test timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// List discovered tests without running them
    #[arg(long)]
    pub list: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Install prefix (defaults to <project>/install)
    #[arg(long)]
    pub prefix: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Project directory (defaults to the nearest Berth.toml)
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,

    /// Target triplet (e.g. x64-linux)
    #[arg(long)]
    pub triplet: Option<String>,

    /// Local port index
    #[arg(long, env = "BERTH_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
