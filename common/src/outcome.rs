//! # Probe Outcomes
//!
//! The terminal value of every probe, and of every resolver entry that never
//! made it to a probe.

use std::fmt;
use std::time::Duration;

use crate::error::ProbeError;
use crate::network::address::ResolvedAddress;
use crate::network::target::Target;

#[derive(Debug)]
pub enum OutcomeKind {
    Replied,
    Unreachable,
    /// No reply before the deadline. Not a failure.
    TimedOut,
    Failed(ProbeError),
}

impl OutcomeKind {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replied => f.write_str("reply"),
            Self::Unreachable => f.write_str("destination unreachable"),
            Self::TimedOut => f.write_str("request timeout"),
            Self::Failed(err) => write!(f, "error: {err}"),
        }
    }
}

/// What a probe was aimed at. Resolver entries that are not IP literals never
/// become a [`ResolvedAddress`] and are kept as the raw string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbedAddress {
    Resolved(ResolvedAddress),
    Unclassified(String),
}

impl fmt::Display for ProbedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(addr) => fmt::Display::fmt(addr, f),
            Self::Unclassified(entry) => f.write_str(entry),
        }
    }
}

#[derive(Debug)]
pub struct ProbeOutcome {
    pub target: Target,
    pub address: ProbedAddress,
    pub kind: OutcomeKind,
    /// Time from send until the receive call returned. Zero when nothing was
    /// sent.
    pub duration: Duration,
}

impl ProbeOutcome {
    pub fn new(target: Target, address: ResolvedAddress, kind: OutcomeKind, duration: Duration) -> Self {
        Self { target, address: ProbedAddress::Resolved(address), kind, duration }
    }

    /// Outcome for a probe that failed before anything was timed.
    pub fn failed(target: Target, address: ResolvedAddress, err: ProbeError) -> Self {
        Self::new(target, address, OutcomeKind::Failed(err), Duration::ZERO)
    }

    pub fn unclassified(target: Target, entry: String, err: ProbeError) -> Self {
        Self {
            target,
            address: ProbedAddress::Unclassified(entry),
            kind: OutcomeKind::Failed(err),
            duration: Duration::ZERO,
        }
    }
}

/// Everything reported for one target.
#[derive(Debug)]
pub struct TargetReport {
    pub target: Target,
    /// `Err` when the name could not be resolved at all.
    pub outcomes: Result<Vec<ProbeOutcome>, ProbeError>,
}

impl TargetReport {
    pub fn failure_count(&self) -> usize {
        match &self.outcomes {
            Ok(outcomes) => outcomes.iter().filter(|o| o.kind.is_failure()).count(),
            Err(_) => 1,
        }
    }
}
