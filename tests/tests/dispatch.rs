use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quickping_common::config::Config;
use quickping_common::error::ProbeError;
use quickping_common::network::target::Target;
use quickping_common::outcome::{OutcomeKind, ProbeOutcome, TargetReport};
use quickping_core::dispatcher::Dispatcher;
use quickping_integration_tests::{FakeNetwork, Peer, RecordingSink, StaticLookup};
use quickping_protocols::icmp::{self, IcmpVersion, PROTOCOL_ICMP, PROTOCOL_ICMPV6};

fn config(timeout: Duration) -> Arc<Config> {
    Arc::new(Config {
        timeout,
        payload: b"quickping".to_vec(),
        identifier: 0x4242,
        ..Config::default()
    })
}

struct Harness {
    network: Arc<FakeNetwork>,
    sink: Arc<RecordingSink>,
    dispatcher: Dispatcher,
}

fn harness(lookup: StaticLookup, network: FakeNetwork, timeout: Duration) -> Harness {
    let network: Arc<FakeNetwork> = Arc::new(network);
    let sink: Arc<RecordingSink> = Arc::new(RecordingSink::default());
    let dispatcher = Dispatcher::new(config(timeout), Arc::new(lookup), network.clone(), sink.clone());
    Harness { network, sink, dispatcher }
}

fn outcomes(report: &TargetReport) -> &[ProbeOutcome] {
    report.outcomes.as_deref().expect("target should have resolved")
}

/// A silent v4 address must not hold back the v6 reply of the same target.
#[tokio::test]
async fn slow_address_does_not_delay_its_sibling() {
    let timeout: Duration = Duration::from_millis(400);
    let lookup = StaticLookup::default().with("dual", &["192.0.2.10", "2001:db8::10"]);
    let network = FakeNetwork::default()
        .with("192.0.2.10", Peer::Silent)
        .with("2001:db8::10", Peer::Replies { after: Duration::ZERO });
    let h = harness(lookup, network, timeout);

    let start: Instant = Instant::now();
    let reports = h.dispatcher.run_all(vec![Target::new("dual")]).await;

    let recorded = h.sink.finished();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].address, "2001:db8::10", "the reply should be reported first");
    assert_eq!(recorded[0].outcome, "reply");
    assert!(
        recorded[0].at.duration_since(start) < timeout / 2,
        "reply waited on the silent address"
    );
    assert_eq!(recorded[1].outcome, "request timeout");
    assert!(recorded[1].at.duration_since(start) >= timeout);

    let found = outcomes(&reports[0]);
    assert_eq!(found.len(), 2);
    let v4 = found.iter().find(|o| o.address.to_string() == "192.0.2.10").unwrap();
    assert!(matches!(v4.kind, OutcomeKind::TimedOut));
    assert!(v4.duration >= timeout);
}

/// A failing address is reported as a failure and nothing else changes.
#[tokio::test]
async fn failure_stays_with_its_address() {
    let lookup = StaticLookup::default().with("mixed", &["198.51.100.7", "2001:db8::7"]);
    let network = FakeNetwork::default()
        .with("198.51.100.7", Peer::Garbage)
        .with("2001:db8::7", Peer::Replies { after: Duration::from_millis(20) });
    let h = harness(lookup, network, Duration::from_secs(2));

    let reports = h.dispatcher.run_all(vec![Target::new("mixed")]).await;

    assert_eq!(reports[0].failure_count(), 1);
    let broken = h.sink.outcome_for("198.51.100.7").unwrap();
    assert!(broken.failed);
    assert!(broken.outcome.starts_with("error: malformed reply"), "{}", broken.outcome);
    let healthy = h.sink.outcome_for("2001:db8::7").unwrap();
    assert_eq!(healthy.outcome, "reply");
}

#[tokio::test]
async fn every_resolver_entry_gets_exactly_one_outcome() {
    for n in [1usize, 2, 5, 16] {
        let entries: Vec<String> = (0..n).map(|i| format!("10.1.0.{}", i + 1)).collect();
        let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
        let mut network = FakeNetwork::default();
        for (i, entry) in refs.iter().enumerate() {
            let peer = if i % 2 == 0 { Peer::Replies { after: Duration::ZERO } } else { Peer::Unreachable };
            network = network.with(entry, peer);
        }
        let h = harness(StaticLookup::default().with("many", &refs), network, Duration::from_millis(200));

        let reports = h.dispatcher.run_all(vec![Target::new("many")]).await;

        assert_eq!(outcomes(&reports[0]).len(), n);
        assert_eq!(h.sink.finished().len(), n);
        assert_eq!(h.network.opened(), n);
        assert_eq!(h.network.closed(), n, "every socket should be closed");
        assert_eq!(reports[0].failure_count(), 0);
    }
}

#[tokio::test]
async fn requests_carry_identifier_sequence_and_payload() {
    let lookup = StaticLookup::default().with("pair", &["203.0.113.5", "2001:db8::5"]);
    let network = FakeNetwork::default()
        .with("203.0.113.5", Peer::Replies { after: Duration::ZERO })
        .with("2001:db8::5", Peer::Replies { after: Duration::ZERO });
    let h = harness(lookup, network, Duration::from_secs(1));

    h.dispatcher.run_all(vec![Target::new("pair")]).await;

    let requests = h.network.requests();
    assert_eq!(requests.len(), 2);
    for (destination, bytes) in requests {
        let (protocol, version) = match destination {
            IpAddr::V4(_) => (PROTOCOL_ICMP, IcmpVersion::V4),
            IpAddr::V6(_) => (PROTOCOL_ICMPV6, IcmpVersion::V6),
        };
        let message = icmp::parse_message(protocol, &bytes).unwrap();
        assert_eq!(message.icmp_type, version.echo_request_type());
        let echo = message.echo().unwrap();
        assert_eq!(echo.identifier, 0x4242);
        assert_eq!(echo.sequence, 1);
        assert_eq!(echo.payload, b"quickping");
    }
}

#[tokio::test]
async fn unresolvable_target_is_reported_and_skipped() {
    let lookup = StaticLookup::default().with("good", &["192.0.2.1"]);
    let network = FakeNetwork::default().with("192.0.2.1", Peer::Unreachable);
    let h = harness(lookup, network, Duration::from_millis(200));

    let reports = h
        .dispatcher
        .run_all(vec![Target::new("nowhere.invalid"), Target::new("good")])
        .await;

    assert_eq!(reports.len(), 2);
    assert!(matches!(reports[0].outcomes, Err(ProbeError::Resolution { .. })));
    assert_eq!(h.sink.unresolved(), vec!["nowhere.invalid".to_string()]);
    let good = outcomes(&reports[1]);
    assert_eq!(good.len(), 1);
    assert!(matches!(good[0].kind, OutcomeKind::Unreachable));
}

/// Targets run one after another, so a later target never starts early.
#[tokio::test]
async fn targets_are_processed_sequentially() {
    let lookup = StaticLookup::default()
        .with("first", &["192.0.2.1"])
        .with("second", &["192.0.2.2"]);
    let network = FakeNetwork::default()
        .with("192.0.2.1", Peer::Replies { after: Duration::from_millis(150) })
        .with("192.0.2.2", Peer::Replies { after: Duration::ZERO });
    let h = harness(lookup, network, Duration::from_secs(1));

    h.dispatcher
        .run_all(vec![Target::new("first"), Target::new("second")])
        .await;

    let order: Vec<String> = h.sink.finished().into_iter().map(|r| r.address).collect();
    assert_eq!(order, vec!["192.0.2.1".to_string(), "192.0.2.2".to_string()]);
}

/// Needs root or CAP_NET_RAW.
#[tokio::test]
#[ignore]
async fn loopback_probe_finishes_within_timeout() {
    let timeout: Duration = Duration::from_secs(2);
    let dispatcher = Dispatcher::system(config(timeout));

    let start: Instant = Instant::now();
    let reports = dispatcher.run_all(vec![Target::new("127.0.0.1")]).await;

    assert!(start.elapsed() < timeout + Duration::from_secs(1), "probe hung");
    assert_eq!(outcomes(&reports[0]).len(), 1);
}
