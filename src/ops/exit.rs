//! Exit codes and error rendering for the binary.

use crate::builder::{AliasError, BuildError, ComposeError};
use crate::export::UnsupportedSchema;
use crate::install::InstallError;
use crate::ops::TestFailure;
use crate::resolver::ResolveError;
use crate::testing::DiscoveryError;
use crate::util::diagnostic::Diagnostic;

/// Process exit classes. Each failure class has its own code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    /// Usage, configuration, manifest and anything unclassified
    Other,
    Resolution,
    Composition,
    Compile,
    Test,
    InstallIo,
}

impl ExitClass {
    pub fn code(self) -> i32 {
        match self {
            ExitClass::Success => 0,
            ExitClass::Other => 1,
            ExitClass::Resolution => 2,
            ExitClass::Composition => 3,
            ExitClass::Compile => 4,
            ExitClass::Test => 5,
            ExitClass::InstallIo => 6,
        }
    }

    /// Classify by the first typed error in the chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<ResolveError>() {
                return ExitClass::Resolution;
            }
            if cause.is::<ComposeError>() || cause.is::<AliasError>() {
                return ExitClass::Composition;
            }
            if let Some(build) = cause.downcast_ref::<BuildError>() {
                return match build {
                    BuildError::CompileFailure { .. } => ExitClass::Compile,
                    BuildError::ToolchainNotFound => ExitClass::Other,
                };
            }
            if cause.is::<TestFailure>() {
                return ExitClass::Test;
            }
            if cause.is::<InstallError>() {
                return ExitClass::InstallIo;
            }
        }
        ExitClass::Other
    }
}

fn coded(diag: Diagnostic, err: &dyn miette::Diagnostic) -> Diagnostic {
    match err.code() {
        Some(code) => diag.with_code(code),
        None => diag,
    }
}

/// Render `err` with the richest diagnostic available in its chain.
pub fn diagnostic_for(err: &anyhow::Error) -> Diagnostic {
    let typed = err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ResolveError>() {
            Some(coded(e.to_diagnostic(), e))
        } else if let Some(e) = cause.downcast_ref::<ComposeError>() {
            Some(coded(e.to_diagnostic(), e))
        } else if let Some(e) = cause.downcast_ref::<BuildError>() {
            Some(coded(e.to_diagnostic(), e))
        } else if let Some(e) = cause.downcast_ref::<InstallError>() {
            Some(coded(e.to_diagnostic(), e))
        } else if let Some(e) = cause.downcast_ref::<DiscoveryError>() {
            Some(coded(e.to_diagnostic(), e))
        } else if let Some(e) = cause.downcast_ref::<TestFailure>() {
            Some(coded(Diagnostic::error(e.to_string()), e))
        } else if let Some(e) = cause.downcast_ref::<UnsupportedSchema>() {
            Some(coded(
                Diagnostic::error(e.to_string()).with_location(e.path.clone()),
                e,
            ))
        } else {
            None
        }
    });

    match typed {
        // Keep the outer context ("failed to configure `calc`") visible.
        Some(diag) if err.chain().count() > 1 => diag.with_context(err.to_string()),
        Some(diag) => diag,
        None => Diagnostic::error(format!("{:#}", err)),
    }
}
