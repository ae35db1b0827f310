//! Listing the test cases a binary reports.

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use std::sync::LazyLock;

use super::{DiscoveryError, TestCase};
use crate::core::TestProtocol;
use crate::util::process::ProcessBuilder;

/// Upper bound for a list-only invocation.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

static GTEST_SUITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\.$").expect("valid suite regex"));

/// Arguments that make a binary print its cases without running them.
pub fn list_args(protocol: TestProtocol) -> &'static [&'static str] {
    match protocol {
        TestProtocol::Berth => &["--list-tests"],
        TestProtocol::Catch2 => &["--list-test-names-only"],
        TestProtocol::Gtest => &["--gtest_list_tests"],
    }
}

/// Run `binary` in list-only mode and collect its cases.
///
/// Duplicate names are kept once, at their first position.
pub fn discover(binary: &Path, protocol: TestProtocol) -> Result<Vec<TestCase>, DiscoveryError> {
    let cmd = ProcessBuilder::new(binary).args(list_args(protocol));
    tracing::debug!("listing tests: {}", cmd.display_command());

    let output = cmd
        .exec_with_timeout(DISCOVERY_TIMEOUT)
        .map_err(|e| DiscoveryError::Spawn {
            binary: binary.to_path_buf(),
            message: format!("{:#}", e),
        })?;

    let Some(status) = output.status else {
        return Err(DiscoveryError::TimedOut {
            binary: binary.to_path_buf(),
            timeout: DISCOVERY_TIMEOUT,
        });
    };
    if !status.success() {
        return Err(DiscoveryError::Failed {
            binary: binary.to_path_buf(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names = parse_listing(protocol, &stdout);
    Ok(names
        .into_iter()
        .enumerate()
        .map(|(id, name)| TestCase {
            name,
            binary: binary.to_path_buf(),
            id,
            protocol,
        })
        .collect())
}

/// Parse list-mode output into unique case names, in order.
pub fn parse_listing(protocol: TestProtocol, output: &str) -> Vec<String> {
    let raw = match protocol {
        // Names are taken verbatim; `lines` already drops `\n` and `\r\n`.
        TestProtocol::Berth | TestProtocol::Catch2 => output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
        TestProtocol::Gtest => parse_gtest(output),
    };

    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn parse_gtest(output: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut suite: Option<String> = None;

    for line in output.lines() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(suite) = &suite {
                names.push(format!("{}.{}", suite, line.trim()));
            }
        } else if let Some(caps) = GTEST_SUITE.captures(line.trim_end()) {
            suite = Some(caps[1].to_string());
        } else {
            suite = None;
        }
    }
    names
}
