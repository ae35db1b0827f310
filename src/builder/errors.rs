//! Composition and build errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::builder::alias::AliasError;
use crate::util::diagnostic::{suggestions, Diagnostic};

fn describe_unknown(reference: &str, declared_later: &bool) -> String {
    if *declared_later {
        format!("`{}`, which is declared after it", reference)
    } else {
        format!("unknown target `{}`", reference)
    }
}

/// One side of a requirement conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    /// Component or package the value came from
    pub origin: String,
    pub value: String,
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sets {}", self.origin, self.value)
    }
}

/// Error while composing the component graph.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ComposeError {
    #[error("cyclic dependency between components: {}", .cycle.join(" -> "))]
    #[diagnostic(code(berth::compose::cycle))]
    CyclicDependency { cycle: Vec<String> },

    #[error("component `{component}` depends on {}", describe_unknown(.reference, .declared_later))]
    #[diagnostic(code(berth::compose::unknown_target))]
    UnknownTarget {
        component: String,
        reference: String,
        declared_in: PathBuf,

        /// The name exists but is declared after the component using it
        declared_later: bool,
    },

    #[error("conflicting {requirement} for `{component}`: {first} but {second}")]
    #[diagnostic(code(berth::compose::requirement_conflict))]
    RequirementConflict {
        component: String,
        requirement: String,
        first: Contributor,
        second: Contributor,
    },

    #[error("component `{name}` is declared more than once")]
    #[diagnostic(code(berth::compose::duplicate))]
    DuplicateComponent { name: String, declared_in: PathBuf },

    #[error("component `{component}` has no sources matching {}", .patterns.join(", "))]
    #[diagnostic(code(berth::compose::no_sources))]
    NoSources {
        component: String,
        patterns: Vec<String>,
    },

    #[error("invalid sources for `{component}`: {message}")]
    #[diagnostic(code(berth::compose::sources))]
    InvalidSources { component: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Alias(#[from] AliasError),
}

impl ComposeError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ComposeError::CyclicDependency { .. } => diag.with_suggestion(
                "Break the cycle by moving shared code into a separate component",
            ),
            ComposeError::UnknownTarget {
                declared_in,
                declared_later,
                ..
            } => {
                let diag = diag.with_location(declared_in);
                let diag = if *declared_later {
                    diag.with_context(
                        "components may only depend on components declared before them",
                    )
                } else {
                    diag
                };
                diag.with_suggestion(suggestions::UNKNOWN_TARGET)
            }
            ComposeError::RequirementConflict { first, second, .. } => diag
                .with_context(first.to_string())
                .with_context(second.to_string())
                .with_suggestion("Make both contributors agree, or use an internal dependency"),
            ComposeError::DuplicateComponent { declared_in, .. } => {
                diag.with_location(declared_in)
            }
            ComposeError::NoSources { .. } | ComposeError::InvalidSources { .. } => diag
                .with_suggestion("Source globs are relative to the file declaring the component"),
            ComposeError::Alias(_) => diag,
        }
    }
}

/// A component that failed to build.
#[derive(Debug, Clone)]
pub struct BuildFailure {
    pub component: String,
    pub message: String,
}

/// A component not built because a dependency failed.
#[derive(Debug, Clone)]
pub struct SkippedComponent {
    pub component: String,
    pub failed_dependency: String,
}

fn describe_failures(failures: &[BuildFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("`{}`", f.component))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error while building the graph.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum BuildError {
    #[error("failed to compile {}", describe_failures(.failures))]
    #[diagnostic(code(berth::build::compile_failure))]
    CompileFailure {
        failures: Vec<BuildFailure>,
        skipped: Vec<SkippedComponent>,
    },

    #[error("no C compiler found; set CC or install cc")]
    #[diagnostic(code(berth::build::no_toolchain))]
    ToolchainNotFound,
}

impl BuildError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::CompileFailure { failures, skipped } => {
                let mut diag = Diagnostic::error(self.to_string());
                for failure in failures {
                    diag = diag.with_context(format!(
                        "`{}`: {}",
                        failure.component,
                        failure.message.trim_end()
                    ));
                }
                for skip in skipped {
                    diag = diag.with_context(format!(
                        "`{}` skipped: dependency `{}` failed",
                        skip.component, skip.failed_dependency
                    ));
                }
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::ToolchainNotFound => Diagnostic::error(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_names_both_contributors() {
        let err = ComposeError::RequirementConflict {
            component: "app".into(),
            requirement: "define `CALC_API`".into(),
            first: Contributor {
                origin: "`library`".into(),
                value: "CALC_API=1".into(),
            },
            second: Contributor {
                origin: "`legacy`".into(),
                value: "CALC_API=0".into(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("`app`"));
        assert!(message.contains("`library` sets CALC_API=1"));
        assert!(message.contains("`legacy` sets CALC_API=0"));
    }

    #[test]
    fn test_compile_failure_lists_skipped() {
        let err = BuildError::CompileFailure {
            failures: vec![BuildFailure {
                component: "library".into(),
                message: "lib.c:3: error".into(),
            }],
            skipped: vec![SkippedComponent {
                component: "calc".into(),
                failed_dependency: "library".into(),
            }],
        };
        assert_eq!(err.to_string(), "failed to compile `library`");
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("`calc` skipped: dependency `library` failed"));
    }
}
