//! # Echo Prober
//!
//! Sends exactly one echo request to one address and waits once, up to the
//! configured timeout, for whatever comes back.
//!
//! ```text
//! Init -> SocketOpen -> Sent -> AwaitingReply -> Replied
//!                                              | Unreachable
//!                                              | TimedOut
//!                                              | Failed
//! ```
//!
//! IPv4 and IPv6 differ only in their wire constants and in how a raw socket
//! frames what it receives, so both run through one [`EchoProber`]
//! parameterised by an [`IcmpFamily`].

use std::marker::PhantomData;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quickping_common::config::Config;
use quickping_common::error::ProbeError;
use quickping_common::network::address::{Family, ResolvedAddress};
use quickping_common::network::target::Target;
use quickping_common::outcome::{OutcomeKind, ProbeOutcome};
use quickping_protocols::icmp::{self, CodecError, IcmpMessage, IcmpVersion, MessageKind};
use tracing::debug;

use crate::network::transport::{self, EchoSocket, SocketOpener};

/// Large enough for an echo reply on an Ethernet MTU. Longer datagrams are
/// truncated by the kernel.
pub const RECV_BUFFER_SIZE: usize = 1500;

/// Every probe is the first and only one for its address.
pub const ECHO_SEQUENCE: u16 = 1;

/// The per-family capability set of a probe.
pub trait IcmpFamily: Send + Sync + 'static {
    const FAMILY: Family;
    const VERSION: IcmpVersion;

    /// Slices the ICMP message out of what the raw socket delivered.
    fn icmp_message(datagram: &[u8]) -> Result<&[u8], CodecError>;
}

pub struct Icmpv4;

impl IcmpFamily for Icmpv4 {
    const FAMILY: Family = Family::V4;
    const VERSION: IcmpVersion = IcmpVersion::V4;

    fn icmp_message(datagram: &[u8]) -> Result<&[u8], CodecError> {
        icmp::strip_ipv4_header(datagram)
    }
}

pub struct Icmpv6;

impl IcmpFamily for Icmpv6 {
    const FAMILY: Family = Family::V6;
    const VERSION: IcmpVersion = IcmpVersion::V6;

    fn icmp_message(datagram: &[u8]) -> Result<&[u8], CodecError> {
        Ok(datagram)
    }
}

pub struct EchoProber<F: IcmpFamily> {
    config: Arc<Config>,
    opener: Arc<dyn SocketOpener>,
    _family: PhantomData<F>,
}

impl<F: IcmpFamily> EchoProber<F> {
    pub fn new(config: Arc<Config>, opener: Arc<dyn SocketOpener>) -> Self {
        Self { config, opener, _family: PhantomData }
    }

    /// Probes `address` once. Never fails: every error becomes an outcome.
    pub fn probe(&self, target: &Target, address: ResolvedAddress) -> ProbeOutcome {
        debug_assert_eq!(address.family, F::FAMILY, "address routed to the wrong prober");
        let (kind, duration) = self.exchange(address.ip);
        ProbeOutcome::new(target.clone(), address, kind, duration)
    }

    fn exchange(&self, destination: IpAddr) -> (OutcomeKind, Duration) {
        let listen: IpAddr = self.config.listen_addr(F::FAMILY);
        // dropped, and so closed, on every return below
        let mut socket: Box<dyn EchoSocket> = match self.opener.open(F::FAMILY, listen) {
            Ok(socket) => socket,
            Err(source) => return untimed(ProbeError::Socket { listen, source }),
        };

        let start: Instant = match self.send_request(socket.as_mut(), destination) {
            Ok(start) => start,
            Err(err) => return untimed(err),
        };

        if let Err(source) = socket.set_read_timeout(self.config.timeout) {
            let err = ProbeError::Transport { op: "set read timeout", source };
            return (OutcomeKind::Failed(err), start.elapsed());
        }

        let mut reply = [0u8; RECV_BUFFER_SIZE];
        let received = socket.recv_from(&mut reply);
        let duration: Duration = start.elapsed();

        let kind: OutcomeKind = match received {
            Ok((len, peer)) => {
                debug!(%destination, %peer, bytes = len, "received ICMP message");
                classify::<F>(&reply[..len], peer)
            }
            Err(err) if transport::is_timeout(&err) => OutcomeKind::TimedOut,
            Err(err) => OutcomeKind::Failed(ProbeError::receive(err)),
        };
        (kind, duration)
    }

    /// Writes the request and returns the instant the RTT is measured from.
    fn send_request(&self, socket: &mut dyn EchoSocket, destination: IpAddr) -> Result<Instant, ProbeError> {
        let request: Vec<u8> = icmp::build_echo_request(
            F::VERSION,
            self.config.identifier,
            ECHO_SEQUENCE,
            &self.config.payload,
        )
        .map_err(ProbeError::Build)?;

        let start: Instant = Instant::now();
        let written: usize = socket.send_to(&request, destination).map_err(ProbeError::send)?;
        if written != request.len() {
            return Err(ProbeError::ShortWrite { written, expected: request.len() });
        }
        debug!(%destination, id = self.config.identifier, bytes = written, "sent echo request");
        Ok(start)
    }
}

fn untimed(err: ProbeError) -> (OutcomeKind, Duration) {
    (OutcomeKind::Failed(err), Duration::ZERO)
}

fn classify<F: IcmpFamily>(datagram: &[u8], peer: IpAddr) -> OutcomeKind {
    let message: IcmpMessage = match F::icmp_message(datagram)
        .and_then(|bytes| icmp::parse_message(F::VERSION.protocol_number(), bytes))
    {
        Ok(message) => message,
        Err(err) => return OutcomeKind::Failed(ProbeError::Parse(err)),
    };

    match message.kind() {
        MessageKind::EchoReply => OutcomeKind::Replied,
        MessageKind::DestinationUnreachable => OutcomeKind::Unreachable,
        MessageKind::Other => OutcomeKind::Failed(ProbeError::UnexpectedMessage { message, peer }),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
