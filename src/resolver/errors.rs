//! Resolution error types and diagnostics.

use std::fmt;

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Who asked for a package, and with which constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub name: String,
    pub constraint: String,
}

impl Requester {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Requester {
            name: name.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` requires {}", self.name, self.constraint)
    }
}

fn describe_requesters(requesters: &[Requester]) -> String {
    requesters
        .iter()
        .map(|r| format!("{} (from `{}`)", r.constraint, r.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error during dependency resolution.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ResolveError {
    #[error("unresolved dependency `{package}`: no version satisfies {}", describe_requesters(.requesters))]
    #[diagnostic(code(berth::resolve::unresolved))]
    UnresolvedDependency {
        package: String,
        requesters: Vec<Requester>,
        available: Vec<String>,
    },

    #[error(
        "version conflict for `{package}`: `{}` requires {} but `{}` requires {}",
        .first.name, .first.constraint, .second.name, .second.constraint
    )]
    #[diagnostic(code(berth::resolve::version_conflict))]
    VersionConflict {
        package: String,
        first: Requester,
        second: Requester,
    },

    #[error("`{requester}` requests feature `{feature}` which `{package} {version}` does not offer")]
    #[diagnostic(code(berth::resolve::unknown_feature))]
    UnknownFeature {
        package: String,
        version: String,
        feature: String,
        requester: String,
        available: Vec<String>,
    },

    #[error("cyclic dependency between packages: {}", .cycle.join(" -> "))]
    #[diagnostic(code(berth::resolve::cycle))]
    CyclicDependency { cycle: Vec<String> },

    #[error("gave up after trying {steps} version selections for {}", .packages.join(", "))]
    #[diagnostic(code(berth::resolve::search_limit))]
    SearchLimit { steps: usize, packages: Vec<String> },

    #[error("failed to query {source_name} for `{package}`: {message}")]
    #[diagnostic(code(berth::resolve::index))]
    Index {
        source_name: String,
        package: String,
        message: String,
    },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnresolvedDependency {
                package,
                requesters,
                available,
            } => {
                let mut diag = Diagnostic::error(format!("unresolved dependency `{}`", package));

                for requester in requesters {
                    diag = diag.with_context(format!("{} {}", requester, package));
                }

                if available.is_empty() {
                    diag = diag
                        .with_context(format!("`{}` is not in the registry", package))
                        .with_suggestion("Check that the package name is spelled correctly");
                } else {
                    diag = diag
                        .with_context(format!("available versions: {}", available.join(", ")))
                        .with_suggestion(format!(
                            "Relax the version constraint on `{}`",
                            package
                        ));
                }

                diag
            }

            ResolveError::VersionConflict {
                package,
                first,
                second,
            } => Diagnostic::error(format!("version conflict for `{}`", package))
                .with_context(format!("{} {}", first, package))
                .with_context(format!("{} {}", second, package))
                .with_context("no version can satisfy both constraints")
                .with_suggestion(format!(
                    "Align the version constraints on `{}` across its requesters",
                    package
                )),

            ResolveError::UnknownFeature {
                package,
                version,
                feature,
                requester,
                available,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "`{} {}` has no feature `{}`",
                    package, version, feature
                ))
                .with_context(format!("requested by `{}`", requester));

                if !available.is_empty() {
                    diag = diag.with_context(format!(
                        "available features: {}",
                        available.join(", ")
                    ));
                }

                diag
            }

            ResolveError::CyclicDependency { cycle } => {
                Diagnostic::error("cycle detected in package dependencies")
                    .with_context(format!("cycle: {}", cycle.join(" -> ")))
                    .with_suggestion(
                        "Break the cycle by removing or restructuring dependencies",
                    )
            }

            ResolveError::SearchLimit { steps, packages } => Diagnostic::error(
                "dependency search did not finish",
            )
            .with_context(format!("{} selections tried; undecided: {}", steps, packages.join(", ")))
            .with_suggestion("Pin exact versions for the packages listed above"),

            ResolveError::Index {
                source_name,
                package,
                message,
            } => Diagnostic::error(format!(
                "failed to read `{}` from {}",
                package, source_name
            ))
            .with_context(message.clone()),
        }
    }
}
