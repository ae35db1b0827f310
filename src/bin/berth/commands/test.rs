//! `berth test` command

use std::time::Duration;

use anyhow::Result;

use super::{build_options, configure_project};
use crate::cli::TestArgs;
use berth::ops::{self, TestFailure};
use berth::testing::{discover, TestFilter, TestOptions, TestOutcome};
use berth::util::diagnostic::{emit, suggestions, Diagnostic};
use berth::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: TestArgs) -> Result<()> {
    let configured = configure_project(gctx, &args.project)?;
    let build = build_options(gctx, &configured, &args.project);

    if args.list {
        return list(gctx, &configured, &build, args.filter.as_deref());
    }

    let options = TestOptions {
        filter: args.filter,
        timeout: args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| configured.config.test_timeout()),
    };
    let report = ops::build_and_test(&configured, &build, &options)?;

    for warning in &report.warnings {
        emit(&warning.to_diagnostic(), gctx.color());
    }

    for (component, result) in &report.results {
        match &result.outcome {
            TestOutcome::Passed => {}
            TestOutcome::Failed { status, output } => {
                eprintln!("\n---- {}/{} ----", component, result.case.name);
                if let Some(code) = status {
                    eprintln!("exit status: {}", code);
                }
                if !output.is_empty() {
                    eprintln!("{}", output);
                }
            }
            TestOutcome::TimedOut { after } => {
                eprintln!(
                    "\n---- {}/{} ----\ntimed out after {}s",
                    component,
                    result.case.name,
                    after.as_secs()
                );
            }
        }
    }

    if report.results.is_empty() && report.warnings.is_empty() {
        emit(
            &Diagnostic::warning("no tests ran").with_suggestion(suggestions::NO_TESTS),
            gctx.color(),
        );
    }

    eprintln!(
        "\ntest result: {}. {} passed; {} failed",
        if report.is_success() { "ok" } else { "FAILED" },
        report.passed(),
        report.failed()
    );

    TestFailure::check(&report)?;
    Ok(())
}

fn list(
    gctx: &GlobalContext,
    configured: &ops::Configured,
    build: &berth::BuildOptions,
    filter: Option<&str>,
) -> Result<()> {
    let filter = TestFilter::parse(filter)?;
    let artifacts = ops::build(configured, build).into_result()?;

    for artifact in artifacts.tests() {
        let protocol = artifact.test_protocol.unwrap_or_default();
        match discover(&artifact.path, protocol) {
            Ok(cases) => {
                for case in cases
                    .iter()
                    .filter(|c| filter.matches(&artifact.component, &c.name))
                {
                    println!("{}/{}", artifact.component, case.name);
                }
            }
            Err(e) => emit(&e.to_diagnostic(), gctx.color()),
        }
    }
    Ok(())
}
