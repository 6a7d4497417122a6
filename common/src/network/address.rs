//! # Resolved Addresses
//!
//! A resolver hands back IP literals. Each one is classified by family
//! before it is probed: anything with a 4-byte form (plain IPv4 or an
//! IPv4-mapped IPv6 literal) goes out as ICMPv4, everything else with a
//! 16-byte form as ICMPv6.

use std::fmt;
use std::net::IpAddr;

use quickping_protocols::icmp::IcmpVersion;

use crate::error::ProbeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl From<Family> for IcmpVersion {
    fn from(family: Family) -> Self {
        match family {
            Family::V4 => IcmpVersion::V4,
            Family::V6 => IcmpVersion::V6,
        }
    }
}

/// An IP address together with the ICMP family used to probe it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    pub ip: IpAddr,
    pub family: Family,
}

impl ResolvedAddress {
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self { ip: IpAddr::V4(v4), family: Family::V4 },
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self { ip: IpAddr::V4(v4), family: Family::V4 },
                None => Self { ip: IpAddr::V6(v6), family: Family::V6 },
            },
        }
    }

    /// Classifies one literal returned by a resolver.
    pub fn classify(entry: &str) -> Result<Self, ProbeError> {
        entry
            .parse::<IpAddr>()
            .map(Self::from_ip)
            .map_err(|_| ProbeError::AddressClassification { entry: entry.to_string() })
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ip, f)
    }
}
