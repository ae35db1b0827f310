//! Test discovery and execution.
//!
//! A test binary is asked to list its cases without running them; every
//! reported case then runs in its own process, so one crash or hang only
//! fails that case.

mod discover;
mod runner;

pub use discover::{discover, list_args, parse_listing, DISCOVERY_TIMEOUT};
pub use runner::{run_args, run_case};

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use crate::builder::Artifacts;
use crate::core::TestProtocol;
use crate::util::diagnostic::Diagnostic;

/// One individually runnable test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub binary: PathBuf,

    /// Position within its binary's listing
    pub id: usize,

    pub protocol: TestProtocol,
}

/// A binary could not list its tests.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum DiscoveryError {
    #[error("failed to start test binary {} in list mode: {message}", .binary.display())]
    #[diagnostic(code(berth::test::discovery_spawn))]
    Spawn { binary: PathBuf, message: String },

    #[error("test binary {} did not list its tests within {}s", .binary.display(), .timeout.as_secs())]
    #[diagnostic(code(berth::test::discovery_timeout))]
    TimedOut { binary: PathBuf, timeout: Duration },

    #[error("test binary {} exited with {status} in list mode", .binary.display())]
    #[diagnostic(code(berth::test::discovery_failed))]
    Failed {
        binary: PathBuf,
        status: String,
        stderr: String,
    },
}

impl DiscoveryError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::warning(self.to_string());
        match self {
            DiscoveryError::Failed { stderr, .. } if !stderr.is_empty() => {
                diag.with_context(stderr.clone())
            }
            _ => diag.with_suggestion("no tests were registered for this binary"),
        }
    }
}

/// Which cases to run.
#[derive(Debug, Clone)]
pub enum TestFilter {
    All,
    Exact(String),
    Glob(glob::Pattern),
}

impl TestFilter {
    /// Parse a user filter; glob metacharacters make it a pattern.
    pub fn parse(filter: Option<&str>) -> Result<Self> {
        let Some(filter) = filter else {
            return Ok(TestFilter::All);
        };
        if filter.contains(['*', '?', '[']) {
            let pattern = glob::Pattern::new(filter)
                .with_context(|| format!("invalid test filter `{}`", filter))?;
            Ok(TestFilter::Glob(pattern))
        } else {
            Ok(TestFilter::Exact(filter.to_string()))
        }
    }

    /// Match against the bare case name or `component/name`.
    pub fn matches(&self, component: &str, name: &str) -> bool {
        let qualified = format!("{}/{}", component, name);
        match self {
            TestFilter::All => true,
            TestFilter::Exact(exact) => exact == name || *exact == qualified,
            TestFilter::Glob(pattern) => pattern.matches(name) || pattern.matches(&qualified),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestOptions {
    pub filter: Option<String>,

    /// Per-case limit
    pub timeout: Duration,
}

impl Default for TestOptions {
    fn default() -> Self {
        TestOptions {
            filter: None,
            timeout: Duration::from_secs(crate::util::config::DEFAULT_TEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum TestOutcome {
    Passed,
    Failed { status: Option<i32>, output: String },
    TimedOut { after: Duration },
}

impl TestOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub case: TestCase,
    pub outcome: TestOutcome,
}

/// Results of a test run.
#[derive(Debug, Default)]
pub struct TestReport {
    /// (component, result) in run order
    pub results: Vec<(String, TestResult)>,

    /// Binaries whose tests could not be listed
    pub warnings: Vec<DiscoveryError>,
}

impl TestReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.outcome.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Names of failed cases, qualified with their component.
    pub fn failures(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, r)| !r.outcome.is_pass())
            .map(|(component, r)| format!("{}/{}", component, r.case.name))
            .collect()
    }
}

/// Discover and run every test case in `artifacts` that passes the filter.
///
/// A binary that fails discovery contributes zero cases and a warning.
pub fn test(artifacts: &Artifacts, options: &TestOptions) -> Result<TestReport> {
    let filter = TestFilter::parse(options.filter.as_deref())?;
    let mut report = TestReport::default();

    for artifact in artifacts.tests() {
        let protocol = artifact.test_protocol.unwrap_or_default();
        let cases = match discover(&artifact.path, protocol) {
            Ok(cases) => cases,
            Err(e) => {
                tracing::warn!("{}", e);
                report.warnings.push(e);
                continue;
            }
        };
        tracing::debug!("{}: {} test case(s)", artifact.component, cases.len());

        for case in cases
            .iter()
            .filter(|c| filter.matches(&artifact.component, &c.name))
        {
            let result = run_case(case, options.timeout);
            match &result.outcome {
                TestOutcome::Passed => {
                    tracing::info!("test {}/{} ... ok", artifact.component, case.name)
                }
                TestOutcome::Failed { .. } => {
                    tracing::info!("test {}/{} ... FAILED", artifact.component, case.name)
                }
                TestOutcome::TimedOut { after } => tracing::info!(
                    "test {}/{} ... timed out after {}s",
                    artifact.component,
                    case.name,
                    after.as_secs()
                ),
            }
            report.results.push((artifact.component.clone(), result));
        }
    }

    Ok(report)
}
