use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::domain::scangate::{
    gate_verdict::GateVerdict, ignore_policy::IgnorePolicy, invariant_violation::InvariantViolation,
};

use super::scan_backend::ScanBackendError;
use super::scan_waiter::ScanOutcome;

#[derive(Error, Debug)]
pub enum GateError {
    #[error(
        "timed out after {0:?} waiting for the image scan to complete, the image was not promoted"
    )]
    ScanTimedOut(Duration),

    #[error("image scan could not be completed: {0}")]
    Backend(#[from] ScanBackendError),

    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),
}

/// Turns the outcome of a scan into a verdict. Timeouts and backend errors
/// never produce a verdict.
pub fn decide(outcome: ScanOutcome, policy: &IgnorePolicy) -> Result<GateVerdict, GateError> {
    let verdict = match outcome {
        ScanOutcome::Findings(findings) => GateVerdict::evaluate(findings, policy)?,
        ScanOutcome::Unsupported { reason } => GateVerdict::for_unsupported_image(reason),
        ScanOutcome::TimedOut { waited } => return Err(GateError::ScanTimedOut(waited)),
        ScanOutcome::BackendError(error) => return Err(error.into()),
    };

    info!(
        findings = verdict.findings().len(),
        ignored = verdict.ignored().len(),
        passed = verdict.passed(),
        "gate decided"
    );

    Ok(verdict)
}
