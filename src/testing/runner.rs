//! Running one test case in its own process.

use std::time::Duration;

use super::{TestCase, TestOutcome, TestResult};
use crate::core::TestProtocol;
use crate::util::process::ProcessBuilder;

/// Arguments that run exactly `name` and nothing else.
pub fn run_args(protocol: TestProtocol, name: &str) -> Vec<String> {
    match protocol {
        TestProtocol::Berth => vec!["--exact".to_string(), name.to_string()],
        TestProtocol::Catch2 => vec![escape_catch2(name)],
        TestProtocol::Gtest => vec![format!("--gtest_filter={}", name)],
    }
}

/// Catch2 reads its argument as a test spec; escape the characters that
/// would otherwise split it or make it a pattern.
fn escape_catch2(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | ',' | '[' | ']' | '*' | '~') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Run `case`, killing it after `timeout`.
pub fn run_case(case: &TestCase, timeout: Duration) -> TestResult {
    let cmd = ProcessBuilder::new(&case.binary).args(run_args(case.protocol, &case.name));
    tracing::debug!("running test: {}", cmd.display_command());

    let outcome = match cmd.exec_with_timeout(timeout) {
        Err(e) => TestOutcome::Failed {
            status: None,
            output: format!("{:#}", e),
        },
        Ok(output) => match output.status {
            None => TestOutcome::TimedOut { after: timeout },
            Some(status) if status.success() => TestOutcome::Passed,
            Some(status) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                TestOutcome::Failed {
                    status: status.code(),
                    output: text.trim_end().to_string(),
                }
            }
        },
    };

    TestResult {
        case: case.clone(),
        outcome,
    }
}
