//! # Error Taxonomy
//!
//! Every failure quickping can hit is scoped to one target or one resolved
//! address. None of them abort the run; they are turned into reported
//! outcomes. A timeout is not an error at all, see
//! [`OutcomeKind::TimedOut`](crate::outcome::OutcomeKind::TimedOut).

use std::io;
use std::net::IpAddr;

use quickping_protocols::icmp::{CodecError, IcmpMessage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The name lookup itself failed. Aborts the whole target.
    #[error("error resolving {target:?}: {source}")]
    Resolution {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The resolver returned something that is not an IP literal.
    #[error("error parsing address {entry:?}: unexpected IP type")]
    AddressClassification { entry: String },

    /// Opening or binding the raw socket failed, usually missing privileges.
    #[error("failed to open raw socket on {listen}: {source}")]
    Socket {
        listen: IpAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to build echo request: {0}")]
    Build(#[source] CodecError),

    /// Send or receive failed for a reason other than the read deadline.
    #[error("{op} failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("short write: got {written}; want {expected}")]
    ShortWrite { written: usize, expected: usize },

    #[error("malformed reply: {0}")]
    Parse(#[source] CodecError),

    /// A well formed message that is neither an echo reply nor a destination
    /// unreachable.
    #[error(
        "got ICMP type {} code {} from {peer}; want echo reply",
        .message.icmp_type,
        .message.code
    )]
    UnexpectedMessage { message: IcmpMessage, peer: IpAddr },

    /// The probe task panicked or was torn down before reporting.
    #[error("probe task did not complete: {0}")]
    Task(String),
}

impl ProbeError {
    pub fn send(source: io::Error) -> Self {
        Self::Transport { op: "send", source }
    }

    pub fn receive(source: io::Error) -> Self {
        Self::Transport { op: "receive", source }
    }
}
