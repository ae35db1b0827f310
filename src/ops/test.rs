//! Implementation of `berth test`.

use anyhow::Result;
use thiserror::Error;

use crate::builder::BuildOptions;
use crate::ops::{build, Configured};
use crate::testing::{self, TestOptions, TestReport};

/// Some test cases failed or timed out.
#[derive(Debug, Error, miette::Diagnostic)]
#[error("{} of {total} test(s) failed: {}", .failed.len(), .failed.join(", "))]
#[diagnostic(code(berth::test::failed))]
pub struct TestFailure {
    /// `component/case` names
    pub failed: Vec<String>,
    pub total: usize,
}

impl TestFailure {
    /// `Err` when `report` has a failed case.
    pub fn check(report: &TestReport) -> Result<(), TestFailure> {
        if report.is_success() {
            Ok(())
        } else {
            Err(TestFailure {
                failed: report.failures(),
                total: report.results.len(),
            })
        }
    }
}

/// Build the project, then discover and run its tests.
pub fn build_and_test(
    configured: &Configured,
    build_options: &BuildOptions,
    test_options: &TestOptions,
) -> Result<TestReport> {
    let artifacts = build(configured, build_options).into_result()?;
    if artifacts.tests().next().is_none() {
        tracing::warn!("`{}` has no test components", configured.manifest.name());
    }
    testing::test(&artifacts, test_options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TestProtocol;
    use crate::testing::{TestCase, TestOutcome, TestResult};

    #[test]
    fn test_failure_names_cases() {
        let case = |name: &str| TestCase {
            name: name.into(),
            binary: "calc_test".into(),
            id: 0,
            protocol: TestProtocol::Berth,
        };
        let report = TestReport {
            results: vec![
                (
                    "calc_test".into(),
                    TestResult {
                        case: case("adds"),
                        outcome: TestOutcome::Passed,
                    },
                ),
                (
                    "calc_test".into(),
                    TestResult {
                        case: case("divides"),
                        outcome: TestOutcome::Failed {
                            status: Some(1),
                            output: String::new(),
                        },
                    },
                ),
            ],
            warnings: Vec::new(),
        };

        let err = TestFailure::check(&report).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 test(s) failed: calc_test/divides");
        assert!(TestFailure::check(&TestReport::default()).is_ok());
    }
}
