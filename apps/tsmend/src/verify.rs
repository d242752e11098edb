//! Post-run verification against the external checker.
//!
//! Success means no regression (`new <= previous`); reaching zero is not
//! required. A checker that fails here never fails the run.

use crate::diagnostics::DiagnosticSource;
use crate::error::CheckerError;
use crate::models::{Verification, VerifyStatus};
use tracing::{info, warn};

/// Re-collect diagnostics and compare with `previous`.
pub fn verify(source: &DiagnosticSource, previous: usize) -> Result<Verification, CheckerError> {
    let new_count = source.collect()?.len();
    Ok(compare(previous, new_count))
}

pub fn compare(previous: usize, new_count: usize) -> Verification {
    Verification {
        previous_count: previous,
        new_count,
        resolved_count: previous.saturating_sub(new_count),
        success: new_count <= previous,
    }
}

/// Verification as reported to users: any obstacle becomes `Skipped`.
pub fn verify_run(
    source: Option<&DiagnosticSource>,
    baseline: Option<usize>,
    dry_run: bool,
) -> VerifyStatus {
    if dry_run {
        return skipped("dry run wrote nothing");
    }
    let Some(source) = source else {
        return skipped("no checker configured");
    };
    let Some(previous) = baseline else {
        return skipped("baseline diagnostics unavailable");
    };
    match verify(source, previous) {
        Ok(v) => {
            info!(before = v.previous_count, after = v.new_count, "verification done");
            VerifyStatus::Done(v)
        }
        Err(e) => {
            warn!("verification skipped: {e}");
            skipped(&e.to_string())
        }
    }
}

fn skipped(reason: &str) -> VerifyStatus {
    VerifyStatus::Skipped {
        reason: reason.to_string(),
    }
}
