//! Fakes for driving the dispatcher without DNS, privileges or a network.

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use quickping_common::error::ProbeError;
use quickping_common::network::address::Family;
use quickping_common::network::target::Target;
use quickping_common::outcome::ProbeOutcome;
use quickping_core::network::transport::{EchoSocket, SocketOpener};
use quickping_core::reporter::OutcomeSink;
use quickping_core::resolver::HostLookup;
use quickping_protocols::icmp::IcmpVersion;

/// Name to resolver entries. Unknown names fail like a missing host.
#[derive(Default)]
pub struct StaticLookup(HashMap<String, Vec<String>>);

impl StaticLookup {
    pub fn with(mut self, name: &str, entries: &[&str]) -> Self {
        self.0.insert(name.to_string(), entries.iter().map(|e| e.to_string()).collect());
        self
    }
}

impl HostLookup for StaticLookup {
    fn lookup(&self, name: &str) -> io::Result<Vec<String>> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such host: {name}")))
    }
}

/// How a fake peer answers an echo request.
#[derive(Clone, Copy, Debug)]
pub enum Peer {
    /// Echo reply mirroring the request, sent after `after`.
    Replies { after: Duration },
    /// ICMP destination unreachable.
    Unreachable,
    /// Nothing; the read deadline expires.
    Silent,
    /// Bytes that are not a valid ICMP message.
    Garbage,
}

/// A pretend network. Addresses without a registered peer stay silent.
#[derive(Default)]
pub struct FakeNetwork {
    peers: HashMap<IpAddr, Peer>,
    requests: Arc<Mutex<Vec<(IpAddr, Vec<u8>)>>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl FakeNetwork {
    pub fn with(mut self, ip: &str, peer: Peer) -> Self {
        self.peers.insert(ip.parse().expect("peer must be an IP literal"), peer);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every request written so far, with its destination.
    pub fn requests(&self) -> Vec<(IpAddr, Vec<u8>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl SocketOpener for FakeNetwork {
    fn open(&self, family: Family, _listen: IpAddr) -> io::Result<Box<dyn EchoSocket>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSocket {
            version: family.into(),
            peers: self.peers.clone(),
            requests: self.requests.clone(),
            sent: None,
            timeout: None,
            closed: self.closed.clone(),
        }))
    }
}

struct FakeSocket {
    version: IcmpVersion,
    peers: HashMap<IpAddr, Peer>,
    requests: Arc<Mutex<Vec<(IpAddr, Vec<u8>)>>>,
    sent: Option<(IpAddr, Vec<u8>)>,
    timeout: Option<Duration>,
    closed: Arc<AtomicUsize>,
}

impl FakeSocket {
    fn expire(&self) -> io::Result<(usize, IpAddr)> {
        thread::sleep(self.timeout.unwrap_or_default());
        Err(io::ErrorKind::WouldBlock.into())
    }

    fn deliver(&self, icmp: Vec<u8>, peer: IpAddr, buffer: &mut [u8]) -> io::Result<(usize, IpAddr)> {
        let datagram: Vec<u8> = match self.version {
            IcmpVersion::V4 => ipv4_datagram(&icmp),
            IcmpVersion::V6 => icmp,
        };
        let len: usize = datagram.len().min(buffer.len());
        buffer[..len].copy_from_slice(&datagram[..len]);
        Ok((len, peer))
    }
}

impl EchoSocket for FakeSocket {
    fn send_to(&mut self, bytes: &[u8], destination: IpAddr) -> io::Result<usize> {
        self.requests.lock().unwrap().push((destination, bytes.to_vec()));
        self.sent = Some((destination, bytes.to_vec()));
        Ok(bytes.len())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = Some(timeout);
        Ok(())
    }

    fn recv_from(&mut self, buffer: &mut [u8]) -> io::Result<(usize, IpAddr)> {
        let Some((destination, request)) = self.sent.clone() else {
            return self.expire();
        };
        match self.peers.get(&destination).copied().unwrap_or(Peer::Silent) {
            Peer::Replies { after } if after >= self.timeout.unwrap_or(Duration::MAX) => self.expire(),
            Peer::Replies { after } => {
                thread::sleep(after);
                let mut reply: Vec<u8> = request;
                reply[0] = self.version.echo_reply_type();
                self.deliver(reply, destination, buffer)
            }
            Peer::Unreachable => {
                let mut message: Vec<u8> = vec![self.version.unreachable_type(), 1, 0, 0, 0, 0, 0, 0];
                message.extend_from_slice(&request);
                self.deliver(message, destination, buffer)
            }
            Peer::Silent => self.expire(),
            Peer::Garbage => self.deliver(vec![0xff; 3], destination, buffer),
        }
    }
}

impl Drop for FakeSocket {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// What a raw IPv4 socket hands back: a bare 20 byte header, then ICMP.
pub fn ipv4_datagram(icmp: &[u8]) -> Vec<u8> {
    let mut datagram: Vec<u8> = vec![0u8; 20];
    datagram[0] = 0x45;
    datagram[9] = 1;
    datagram.extend_from_slice(icmp);
    datagram
}

/// One reported outcome, stamped with when the sink saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub address: String,
    pub outcome: String,
    pub failed: bool,
    pub at: Instant,
}

#[derive(Default)]
pub struct RecordingSink {
    finished: Mutex<Vec<Recorded>>,
    unresolved: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn finished(&self) -> Vec<Recorded> {
        self.finished.lock().unwrap().clone()
    }

    pub fn unresolved(&self) -> Vec<String> {
        self.unresolved.lock().unwrap().clone()
    }

    pub fn outcome_for(&self, address: &str) -> Option<Recorded> {
        self.finished().into_iter().find(|r| r.address == address)
    }
}

impl OutcomeSink for RecordingSink {
    fn probe_finished(&self, outcome: &ProbeOutcome) {
        self.finished.lock().unwrap().push(Recorded {
            address: outcome.address.to_string(),
            outcome: outcome.kind.to_string(),
            failed: outcome.kind.is_failure(),
            at: Instant::now(),
        });
    }

    fn resolution_failed(&self, target: &Target, _err: &ProbeError) {
        self.unresolved.lock().unwrap().push(target.to_string());
    }
}
