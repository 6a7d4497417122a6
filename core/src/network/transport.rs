//! Raw ICMP sockets.
//!
//! Probes never touch `socket2` directly. They go through [`SocketOpener`]
//! and [`EchoSocket`] so tests can script replies, delays and failures
//! without privileges.

use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use quickping_common::network::address::Family;
use socket2::{Domain, Protocol, Socket, Type};

/// `SO_RCVTIMEO` treats zero as "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_micros(1);

/// One bound ICMP socket, owned by exactly one probe.
pub trait EchoSocket: Send {
    fn send_to(&mut self, bytes: &[u8], destination: IpAddr) -> io::Result<usize>;

    /// Bounds the next [`EchoSocket::recv_from`]. Expiry surfaces as
    /// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`].
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    fn recv_from(&mut self, buffer: &mut [u8]) -> io::Result<(usize, IpAddr)>;
}

pub trait SocketOpener: Send + Sync {
    fn open(&self, family: Family, listen: IpAddr) -> io::Result<Box<dyn EchoSocket>>;
}

/// Opens real `SOCK_RAW` sockets. Needs root or `CAP_NET_RAW`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSocketOpener;

impl SocketOpener for RawSocketOpener {
    fn open(&self, family: Family, listen: IpAddr) -> io::Result<Box<dyn EchoSocket>> {
        let (domain, protocol) = match family {
            Family::V4 => (Domain::IPV4, Protocol::ICMPV4),
            Family::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };
        let socket = Socket::new(domain, Type::RAW, Some(protocol))?;
        socket.bind(&SocketAddr::new(listen, 0).into())?;
        // std's datagram calls work on any connectionless fd
        Ok(Box::new(RawIcmpSocket { inner: socket.into() }))
    }
}

struct RawIcmpSocket {
    inner: UdpSocket,
}

impl EchoSocket for RawIcmpSocket {
    fn send_to(&mut self, bytes: &[u8], destination: IpAddr) -> io::Result<usize> {
        self.inner.send_to(bytes, SocketAddr::new(destination, 0))
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.inner.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))
    }

    fn recv_from(&mut self, buffer: &mut [u8]) -> io::Result<(usize, IpAddr)> {
        let (len, peer) = self.inner.recv_from(buffer)?;
        Ok((len, peer.ip()))
    }
}

pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
