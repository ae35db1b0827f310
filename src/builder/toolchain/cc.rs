//! Unix-style `cc`/`c++`/`ar` driver.

use std::path::{Path, PathBuf};

use crate::builder::errors::BuildError;
use crate::core::Language;
use crate::util::process::{find_ar, find_c_compiler, find_cxx_compiler};

use super::{ArchiveInput, CommandSpec, CompileInput, LinkInput, Toolchain};

/// GCC/Clang compatible toolchain.
#[derive(Debug, Clone)]
pub struct CcToolchain {
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub ar: PathBuf,
}

impl CcToolchain {
    pub fn new(cc: impl Into<PathBuf>, cxx: impl Into<PathBuf>, ar: impl Into<PathBuf>) -> Self {
        CcToolchain {
            cc: cc.into(),
            cxx: cxx.into(),
            ar: ar.into(),
        }
    }

    /// Find a toolchain on `PATH`, honouring `CC`, `CXX` and `AR`.
    pub fn detect() -> Result<Self, BuildError> {
        let cc = find_c_compiler().ok_or(BuildError::ToolchainNotFound)?;
        let cxx = find_cxx_compiler().unwrap_or_else(|| Self::infer_cxx(&cc));
        let ar = find_ar().unwrap_or_else(|| PathBuf::from("ar"));
        tracing::debug!(
            "detected toolchain cc={} cxx={} ar={}",
            cc.display(),
            cxx.display(),
            ar.display()
        );
        Ok(CcToolchain { cc, cxx, ar })
    }

    /// C++ driver next to a C driver.
    ///
    /// - gcc, x86_64-linux-gnu-gcc -> g++, x86_64-linux-gnu-g++
    /// - clang -> clang++
    /// - cc, /usr/bin/cc -> c++, /usr/bin/c++
    pub fn infer_cxx(cc: &Path) -> PathBuf {
        let cc_str = cc.to_string_lossy();

        if let Some(prefix) = cc_str.strip_suffix("gcc") {
            return PathBuf::from(format!("{}g++", prefix));
        }
        if cc_str.ends_with("clang") {
            return PathBuf::from(format!("{}++", cc_str));
        }

        // Only a complete basename, not "mycc"
        let standalone_cc = cc_str == "cc" || cc_str.ends_with("/cc") || cc_str.ends_with("-cc");
        if standalone_cc {
            return PathBuf::from(format!("{}++", &cc_str[..cc_str.len() - 1]));
        }

        PathBuf::from(format!("{}++", cc_str))
    }

    fn driver(&self, language: Language) -> &Path {
        match language {
            Language::C => &self.cc,
            Language::Cxx => &self.cxx,
        }
    }
}

impl Toolchain for CcToolchain {
    fn describe(&self) -> String {
        format!("cc ({})", self.cc.display())
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        CommandSpec::new(self.driver(input.language))
            .arg("-c")
            .args(input.flags.iter().cloned())
            .arg(input.source.display().to_string())
            .arg("-o")
            .arg(input.output.display().to_string())
    }

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        CommandSpec::new(&self.ar)
            .arg("rcs")
            .arg(input.output.display().to_string())
            .args(input.objects.iter().map(|o| o.display().to_string()))
    }

    fn link_exe_command(&self, input: &LinkInput) -> CommandSpec {
        CommandSpec::new(self.driver(input.language))
            .arg("-o")
            .arg(input.output.display().to_string())
            .args(input.objects.iter().map(|o| o.display().to_string()))
            .args(input.artifacts.iter().map(|a| a.display().to_string()))
            .args(input.flags.iter().cloned())
    }
}
