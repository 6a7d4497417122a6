//! Hands outcomes to the log sink.

use quickping_common::error::ProbeError;
use quickping_common::network::target::Target;
use quickping_common::outcome::{OutcomeKind, ProbeOutcome};
use tracing::{error, info, warn};

/// `tracing` target every outcome event is emitted under.
pub const OUTCOME_TARGET: &str = "quickping::outcome";

/// Receives every outcome as soon as it is known.
pub trait OutcomeSink: Send + Sync {
    fn probe_finished(&self, outcome: &ProbeOutcome);

    fn resolution_failed(&self, target: &Target, err: &ProbeError);
}

/// Emits one `tracing` event per outcome under [`OUTCOME_TARGET`], with
/// `target`, `addr` and `duration` fields, plus `error` for failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl OutcomeSink for LogReporter {
    fn probe_finished(&self, outcome: &ProbeOutcome) {
        let target = &outcome.target;
        let addr = &outcome.address;
        let duration = outcome.duration;
        match &outcome.kind {
            OutcomeKind::Replied => {
                info!(target: OUTCOME_TARGET, %target, %addr, ?duration, "got reply");
            }
            OutcomeKind::Unreachable => {
                warn!(target: OUTCOME_TARGET, %target, %addr, ?duration, "destination unreachable");
            }
            OutcomeKind::TimedOut => {
                warn!(target: OUTCOME_TARGET, %target, %addr, ?duration, "request timeout");
            }
            OutcomeKind::Failed(err) => {
                error!(target: OUTCOME_TARGET, %target, %addr, ?duration, error = %err, "probe failed");
            }
        }
    }

    fn resolution_failed(&self, target: &Target, err: &ProbeError) {
        error!(target: OUTCOME_TARGET, %target, error = %err, "resolution failed");
    }
}
