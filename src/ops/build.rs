//! Implementation of `berth build`.

use crate::builder::{BuildOptions, BuildOutcome, Executor};
use crate::ops::Configured;

/// Build every component of a configured project.
///
/// A failed component fails its transitive dependents only; everything else
/// still builds. Use [`BuildOutcome::into_result`] to turn failures into an
/// error.
pub fn build(configured: &Configured, options: &BuildOptions) -> BuildOutcome {
    let outcome = Executor::new(
        &configured.graph,
        configured.toolchain.as_ref(),
        options.clone(),
    )
    .execute();

    if !outcome.is_success() {
        tracing::debug!(
            "{} component(s) failed, {} skipped",
            outcome.failures.len(),
            outcome.skipped.len()
        );
    }
    outcome
}
