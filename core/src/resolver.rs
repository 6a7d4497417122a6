//! # Address Resolver
//!
//! Turns a target into the addresses it should be probed at. The system
//! resolver is consulted for every target, literals included, and whatever it
//! returns is probed as-is: no ordering, no deduplication.

use std::io;
use std::sync::Arc;

use quickping_common::error::ProbeError;
use quickping_common::network::address::ResolvedAddress;
use quickping_common::network::target::Target;
use tracing::debug;

/// One resolver entry: classified, or rejected on its own.
pub type Resolution = Result<ResolvedAddress, ProbeError>;

pub trait HostLookup: Send + Sync {
    /// Returns the IP literals `name` resolves to.
    fn lookup(&self, name: &str) -> io::Result<Vec<String>>;
}

/// `getaddrinfo` through `dns-lookup`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    fn lookup(&self, name: &str) -> io::Result<Vec<String>> {
        let ips = dns_lookup::lookup_host(name)?;
        Ok(ips.into_iter().map(|ip| ip.to_string()).collect())
    }
}

#[derive(Clone)]
pub struct Resolver {
    lookup: Arc<dyn HostLookup>,
}

impl Resolver {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self { lookup }
    }

    /// Fails only when the lookup itself fails. Entries that are not IP
    /// literals come back as per-entry [`ProbeError::AddressClassification`].
    pub fn resolve(&self, target: &Target) -> Result<Vec<Resolution>, ProbeError> {
        let name: &str = target.as_str().trim();
        if name.is_empty() {
            return Err(ProbeError::Resolution {
                target: target.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty host name"),
            });
        }

        let entries: Vec<String> = self.lookup.lookup(name).map_err(|source| ProbeError::Resolution {
            target: target.to_string(),
            source,
        })?;
        debug!(%target, count = entries.len(), "resolved");

        Ok(entries.iter().map(|entry| ResolvedAddress::classify(entry)).collect())
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemLookup))
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
