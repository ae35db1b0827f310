//! Toolchain abstraction.
//!
//! The builder never runs a compiler directly; it asks a [`Toolchain`] for
//! the command that compiles one source, archives a static library or links
//! an executable, then runs that command.

use std::path::PathBuf;

use crate::core::Language;
use crate::util::process::ProcessBuilder;

mod cc;

pub use cc::CcToolchain;

/// A program and its arguments, as produced by a [`Toolchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    pub fn to_process(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program).args(&self.args)
    }
}

/// Input for a compile step.
#[derive(Debug, Clone)]
pub struct CompileInput {
    pub source: PathBuf,
    pub output: PathBuf,
    pub language: Language,

    /// Profile and usage-requirement flags, already rendered
    pub flags: Vec<String>,
}

/// Input for an archive step.
#[derive(Debug, Clone)]
pub struct ArchiveInput {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Input for an executable link step.
#[derive(Debug, Clone)]
pub struct LinkInput {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,

    /// Linker driver; C++ when any linked code is C++
    pub language: Language,

    /// Static libraries built in this graph, dependents first
    pub artifacts: Vec<PathBuf>,

    /// Search dirs, libraries and options
    pub flags: Vec<String>,
}

/// Generates compile, archive and link commands.
pub trait Toolchain: Send + Sync {
    /// Short human-readable description (`cc (/usr/bin/cc)`).
    fn describe(&self) -> String;

    fn compile_command(&self, input: &CompileInput) -> CommandSpec;

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec;

    fn link_exe_command(&self, input: &LinkInput) -> CommandSpec;
}
