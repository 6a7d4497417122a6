//! # Dispatcher
//!
//! Runs targets one after another. Within a target every resolved address is
//! probed on its own blocking task, and the target is only done once all of
//! them have reported.
//!
//! Nothing here propagates an error: resolution failures, per-address
//! failures and even panicking probe tasks all end up as reported outcomes.

use std::sync::Arc;

use quickping_common::config::Config;
use quickping_common::error::ProbeError;
use quickping_common::network::address::{Family, ResolvedAddress};
use quickping_common::network::target::Target;
use quickping_common::outcome::{ProbeOutcome, TargetReport};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};

use crate::network::transport::{RawSocketOpener, SocketOpener};
use crate::prober::{EchoProber, Icmpv4, Icmpv6};
use crate::reporter::{LogReporter, OutcomeSink};
use crate::resolver::{HostLookup, Resolution, Resolver, SystemLookup};

pub struct Dispatcher {
    resolver: Resolver,
    v4: Arc<EchoProber<Icmpv4>>,
    v6: Arc<EchoProber<Icmpv6>>,
    reporter: Arc<dyn OutcomeSink>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        lookup: Arc<dyn HostLookup>,
        opener: Arc<dyn SocketOpener>,
        reporter: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            resolver: Resolver::new(lookup),
            v4: Arc::new(EchoProber::new(config.clone(), opener.clone())),
            v6: Arc::new(EchoProber::new(config, opener)),
            reporter,
        }
    }

    /// System resolver, raw sockets and log output.
    pub fn system(config: Arc<Config>) -> Self {
        Self::new(config, Arc::new(SystemLookup), Arc::new(RawSocketOpener), Arc::new(LogReporter))
    }

    /// Probes every target in order and returns what was reported for each.
    pub async fn run_all(&self, targets: Vec<Target>) -> Vec<TargetReport> {
        let mut reports: Vec<TargetReport> = Vec::with_capacity(targets.len());
        for target in targets {
            let span = info_span!("target", %target);
            reports.push(self.run_target(target).instrument(span).await);
        }
        reports
    }

    pub async fn run_target(&self, target: Target) -> TargetReport {
        let resolved: Vec<Resolution> = match self.resolve(&target).await {
            Ok(resolved) => resolved,
            Err(err) => {
                self.reporter.resolution_failed(&target, &err);
                return TargetReport { target, outcomes: Err(err) };
            }
        };

        let mut outcomes: Vec<ProbeOutcome> = Vec::with_capacity(resolved.len());
        let mut probes: Vec<(ResolvedAddress, JoinHandle<ProbeOutcome>)> = Vec::new();
        for entry in resolved {
            match entry {
                Ok(address) => probes.push((address, self.spawn_probe(target.clone(), address))),
                Err(err) => {
                    let outcome = unclassified(target.clone(), err);
                    self.reporter.probe_finished(&outcome);
                    outcomes.push(outcome);
                }
            }
        }
        debug!(probes = probes.len(), "waiting for probes");

        // probes report themselves, only the barrier is sequential
        for (address, handle) in probes {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_err) => {
                    let err = ProbeError::Task(join_err.to_string());
                    let outcome = ProbeOutcome::failed(target.clone(), address, err);
                    self.reporter.probe_finished(&outcome);
                    outcomes.push(outcome);
                }
            }
        }

        TargetReport { target, outcomes: Ok(outcomes) }
    }

    async fn resolve(&self, target: &Target) -> Result<Vec<Resolution>, ProbeError> {
        let resolver: Resolver = self.resolver.clone();
        let lookup_target: Target = target.clone();
        tokio::task::spawn_blocking(move || resolver.resolve(&lookup_target))
            .await
            .map_err(|join_err| ProbeError::Resolution {
                target: target.to_string(),
                source: std::io::Error::other(join_err.to_string()),
            })?
    }

    fn spawn_probe(&self, target: Target, address: ResolvedAddress) -> JoinHandle<ProbeOutcome> {
        let reporter: Arc<dyn OutcomeSink> = self.reporter.clone();
        match address.family {
            Family::V4 => {
                let prober = self.v4.clone();
                tokio::task::spawn_blocking(move || {
                    let outcome = prober.probe(&target, address);
                    reporter.probe_finished(&outcome);
                    outcome
                })
            }
            Family::V6 => {
                let prober = self.v6.clone();
                tokio::task::spawn_blocking(move || {
                    let outcome = prober.probe(&target, address);
                    reporter.probe_finished(&outcome);
                    outcome
                })
            }
        }
    }
}

fn unclassified(target: Target, err: ProbeError) -> ProbeOutcome {
    let entry: String = match &err {
        ProbeError::AddressClassification { entry } => entry.clone(),
        other => other.to_string(),
    };
    ProbeOutcome::unclassified(target, entry, err)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
