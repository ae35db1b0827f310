//! User-facing diagnostic messages.
//!
//! Every error shown to a user names the root cause, the constraint or edge
//! that triggered it, and where possible a next step. Typed errors carry a
//! stable code (`berth::compose::cycle`) which is printed after the
//! severity.

use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    pub const UNKNOWN_TARGET: &str =
        "declare the component before it is used, or add the package to `dependencies`";

    pub const BUILD_FAILED: &str = "run `berth build --verbose` for compiler output";

    pub const NO_TESTS: &str = "declare a component with kind = \"test\"";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }

    /// ANSI style for the label.
    fn style(self) -> &'static str {
        match self {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
            Severity::Note => "1;36",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A message with optional code, location, context lines and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub code: Option<String>,
    pub location: Option<PathBuf>,
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            code: None,
            location: None,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl fmt::Display) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for a terminal, with ANSI styling when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |style: &str, text: &str| {
            if color {
                format!("\x1b[{}m{}\x1b[0m", style, text)
            } else {
                text.to_string()
            }
        };

        let mut out = paint(self.severity.style(), self.severity.label());
        if let Some(code) = &self.code {
            let _ = write!(out, "[{}]", code);
        }
        let _ = writeln!(out, ": {}", self.message);

        if let Some(path) = &self.location {
            let _ = writeln!(out, "  --> {}", path.display());
        }
        for line in &self.context {
            let _ = writeln!(out, "  = {}", line);
        }
        match self.suggestions.as_slice() {
            [] => {}
            [only] => {
                let _ = writeln!(out, "{}: {}", paint("1;32", "help"), only);
            }
            many => {
                let _ = writeln!(out, "{}: consider:", paint("1;32", "help"));
                for (i, suggestion) in many.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", i + 1, suggestion);
                }
            }
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_code_and_context() {
        let diag = Diagnostic::error("version conflict for `zlib`")
            .with_code("berth::resolve::version_conflict")
            .with_context("`app` requires >=1.3")
            .with_context("`png 1.6.0` requires <1.3")
            .with_suggestion("Align the version constraints on `zlib`");

        let output = diag.format(false);
        assert!(output.starts_with("error[berth::resolve::version_conflict]: version conflict"));
        assert!(output.contains("  = `app` requires >=1.3\n"));
        assert!(output.contains("help: Align the version constraints"));
    }

    #[test]
    fn test_several_suggestions_are_numbered() {
        let output = Diagnostic::error("build failed")
            .with_suggestion("first")
            .with_suggestion("second")
            .format(false);
        assert!(output.contains("help: consider:\n  1. first\n  2. second\n"));
    }

    #[test]
    fn test_warning_with_location() {
        let diag = Diagnostic::warning("no tests discovered").with_location("build/tests/unit_test");
        let output = diag.format(false);
        assert!(output.starts_with("warning: no tests discovered"));
        assert!(output.contains("--> build/tests/unit_test"));
        assert!(!output.contains("help"));
    }

    #[test]
    fn test_color_wraps_label() {
        let output = Diagnostic::note("reused 2 packages").format(true);
        assert!(output.starts_with("\x1b[1;36mnote\x1b[0m: reused"));
    }
}
