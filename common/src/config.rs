use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use crate::network::address::Family;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one run. Built once at startup and shared read-only by every
/// probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long a probe waits for its single reply.
    pub timeout: Duration,
    /// Local address raw ICMPv4 sockets are bound to.
    pub listen4: Ipv4Addr,
    /// Local address raw ICMPv6 sockets are bound to.
    pub listen6: Ipv6Addr,
    /// Data carried in every echo request.
    pub payload: Vec<u8>,
    /// Echo identifier, the low 16 bits of the process id unless overridden.
    pub identifier: u16,
}

impl Config {
    pub fn listen_addr(&self, family: Family) -> IpAddr {
        match family {
            Family::V4 => IpAddr::V4(self.listen4),
            Family::V6 => IpAddr::V6(self.listen6),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            listen4: Ipv4Addr::UNSPECIFIED,
            listen6: Ipv6Addr::UNSPECIFIED,
            payload: Vec::new(),
            identifier: process_identifier(),
        }
    }
}

/// Not unique across hosts or reboots, only a hint for matching replies.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}
