//! # ICMP echo codec
//!
//! Builds echo requests and decodes whatever comes back on a raw ICMP socket,
//! for both ICMPv4 (protocol 1) and ICMPv6 (protocol 58).
//!
//! Both families share the same echo layout:
//!
//! ```text
//! 0       8       16              32
//! +-------+-------+---------------+
//! | type  | code  |   checksum    |
//! +-------+-------+---------------+
//! |  identifier   |   sequence    |
//! +---------------+---------------+
//! |           payload ...         |
//! ```
//!
//! The ICMPv6 checksum covers a pseudo-header with the source address, which
//! is only known to the kernel. Raw ICMPv6 sockets fill it in on send, so
//! [`build_echo_request`] leaves it zero for [`IcmpVersion::V6`].

use pnet::packet::Packet;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpType, IcmpTypes};
use pnet::packet::icmpv6::{self, Icmpv6Code, Icmpv6Packet, Icmpv6Type, Icmpv6Types};
use pnet::packet::ipv4::Ipv4Packet;
use thiserror::Error;

pub const PROTOCOL_ICMP: u8 = 1;
pub const PROTOCOL_ICMPV6: u8 = 58;

/// Type, code and checksum.
pub const ICMP_HDR_LEN: usize = 4;
/// Header plus identifier and sequence.
pub const ECHO_HDR_LEN: usize = 8;

const IPV4_MIN_HDR_LEN: usize = 20;
const MAX_IP_DATAGRAM: usize = u16::MAX as usize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown ICMP protocol number {0}")]
    UnknownProtocol(u8),
    #[error("message too short: got {got} bytes, need at least {needed}")]
    Truncated { got: usize, needed: usize },
    #[error("invalid IPv4 header in front of ICMP message")]
    InvalidIpv4Header,
    #[error("payload of {len} bytes exceeds the {max} byte maximum")]
    PayloadTooLarge { len: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcmpVersion {
    V4,
    V6,
}

impl IcmpVersion {
    pub fn from_protocol(protocol: u8) -> Result<Self, CodecError> {
        match protocol {
            PROTOCOL_ICMP => Ok(Self::V4),
            PROTOCOL_ICMPV6 => Ok(Self::V6),
            other => Err(CodecError::UnknownProtocol(other)),
        }
    }

    pub fn protocol_number(self) -> u8 {
        match self {
            Self::V4 => PROTOCOL_ICMP,
            Self::V6 => PROTOCOL_ICMPV6,
        }
    }

    pub fn echo_request_type(self) -> u8 {
        match self {
            Self::V4 => IcmpTypes::EchoRequest.0,
            Self::V6 => Icmpv6Types::EchoRequest.0,
        }
    }

    pub fn echo_reply_type(self) -> u8 {
        match self {
            Self::V4 => IcmpTypes::EchoReply.0,
            Self::V6 => Icmpv6Types::EchoReply.0,
        }
    }

    pub fn unreachable_type(self) -> u8 {
        match self {
            Self::V4 => IcmpTypes::DestinationUnreachable.0,
            Self::V6 => Icmpv6Types::DestinationUnreachable.0,
        }
    }

    /// Largest echo payload that still fits in a single IP datagram.
    pub fn max_payload(self) -> usize {
        match self {
            // total length includes the IPv4 header
            Self::V4 => MAX_IP_DATAGRAM - IPV4_MIN_HDR_LEN - ECHO_HDR_LEN,
            // payload length excludes the fixed IPv6 header
            Self::V6 => MAX_IP_DATAGRAM - ECHO_HDR_LEN,
        }
    }

    fn is_echo(self, icmp_type: u8) -> bool {
        icmp_type == self.echo_request_type() || icmp_type == self.echo_reply_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    EchoReply,
    DestinationUnreachable,
    Other,
}

/// Body of an echo request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Echo {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Echo(Echo),
    /// Everything after the 4 byte header, undecoded.
    Raw(Vec<u8>),
}

/// A decoded ICMP or ICMPv6 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub version: IcmpVersion,
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub body: MessageBody,
}

impl IcmpMessage {
    pub fn kind(&self) -> MessageKind {
        if self.icmp_type == self.version.echo_reply_type() {
            MessageKind::EchoReply
        } else if self.icmp_type == self.version.unreachable_type() {
            MessageKind::DestinationUnreachable
        } else {
            MessageKind::Other
        }
    }

    pub fn echo(&self) -> Option<&Echo> {
        match &self.body {
            MessageBody::Echo(echo) => Some(echo),
            MessageBody::Raw(_) => None,
        }
    }
}

/// Marshals an echo request. The length of the returned buffer is the number
/// of bytes a complete write has to report.
pub fn build_echo_request(
    version: IcmpVersion,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<Vec<u8>, CodecError> {
    let max: usize = version.max_payload();
    if payload.len() > max {
        return Err(CodecError::PayloadTooLarge { len: payload.len(), max });
    }

    let total_len: usize = ECHO_HDR_LEN + payload.len();
    let mut buffer: Vec<u8> = vec![0u8; total_len];
    match version {
        IcmpVersion::V4 => write_echo_v4(&mut buffer, identifier, sequence, payload)?,
        IcmpVersion::V6 => write_echo_v6(&mut buffer, identifier, sequence, payload)?,
    }
    Ok(buffer)
}

fn write_echo_v4(
    buffer: &mut [u8],
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<(), CodecError> {
    let got: usize = buffer.len();
    let mut echo = icmp::echo_request::MutableEchoRequestPacket::new(buffer)
        .ok_or(CodecError::Truncated { got, needed: ECHO_HDR_LEN })?;
    echo.set_icmp_type(IcmpTypes::EchoRequest);
    echo.set_icmp_code(IcmpCode::new(0));
    echo.set_identifier(identifier);
    echo.set_sequence_number(sequence);
    echo.set_payload(payload);
    echo.set_checksum(0);

    let header = IcmpPacket::new(echo.packet()).ok_or(CodecError::Truncated {
        got,
        needed: ICMP_HDR_LEN,
    })?;
    let sum: u16 = icmp::checksum(&header);
    echo.set_checksum(sum);
    Ok(())
}

fn write_echo_v6(
    buffer: &mut [u8],
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<(), CodecError> {
    let got: usize = buffer.len();
    let mut echo = icmpv6::echo_request::MutableEchoRequestPacket::new(buffer)
        .ok_or(CodecError::Truncated { got, needed: ECHO_HDR_LEN })?;
    echo.set_icmpv6_type(Icmpv6Types::EchoRequest);
    echo.set_icmpv6_code(Icmpv6Code::new(0));
    echo.set_identifier(identifier);
    echo.set_sequence_number(sequence);
    echo.set_payload(payload);
    echo.set_checksum(0);
    Ok(())
}

/// Decodes `bytes` as a message of the ICMP flavour named by `protocol`.
pub fn parse_message(protocol: u8, bytes: &[u8]) -> Result<IcmpMessage, CodecError> {
    let version: IcmpVersion = IcmpVersion::from_protocol(protocol)?;
    if bytes.len() < ICMP_HDR_LEN {
        return Err(CodecError::Truncated { got: bytes.len(), needed: ICMP_HDR_LEN });
    }

    let (icmp_type, code, checksum) = match version {
        IcmpVersion::V4 => {
            let packet = IcmpPacket::new(bytes).ok_or(CodecError::Truncated {
                got: bytes.len(),
                needed: ICMP_HDR_LEN,
            })?;
            let IcmpType(icmp_type) = packet.get_icmp_type();
            let IcmpCode(code) = packet.get_icmp_code();
            (icmp_type, code, packet.get_checksum())
        }
        IcmpVersion::V6 => {
            let packet = Icmpv6Packet::new(bytes).ok_or(CodecError::Truncated {
                got: bytes.len(),
                needed: ICMP_HDR_LEN,
            })?;
            let Icmpv6Type(icmp_type) = packet.get_icmpv6_type();
            let Icmpv6Code(code) = packet.get_icmpv6_code();
            (icmp_type, code, packet.get_checksum())
        }
    };

    let body: MessageBody = if version.is_echo(icmp_type) {
        MessageBody::Echo(parse_echo(version, bytes)?)
    } else {
        MessageBody::Raw(bytes[ICMP_HDR_LEN..].to_vec())
    };

    Ok(IcmpMessage { version, icmp_type, code, checksum, body })
}

// requests and replies share one layout, the reply view reads both
fn parse_echo(version: IcmpVersion, bytes: &[u8]) -> Result<Echo, CodecError> {
    let truncated = CodecError::Truncated { got: bytes.len(), needed: ECHO_HDR_LEN };
    match version {
        IcmpVersion::V4 => {
            let echo = icmp::echo_reply::EchoReplyPacket::new(bytes).ok_or(truncated)?;
            Ok(Echo {
                identifier: echo.get_identifier(),
                sequence: echo.get_sequence_number(),
                payload: echo.payload().to_vec(),
            })
        }
        IcmpVersion::V6 => {
            let echo = icmpv6::echo_reply::EchoReplyPacket::new(bytes).ok_or(truncated)?;
            Ok(Echo {
                identifier: echo.get_identifier(),
                sequence: echo.get_sequence_number(),
                payload: echo.payload().to_vec(),
            })
        }
    }
}

/// Raw IPv4 sockets hand back the whole datagram. Returns the ICMP message
/// that follows the IP header.
pub fn strip_ipv4_header(datagram: &[u8]) -> Result<&[u8], CodecError> {
    let ipv4 = Ipv4Packet::new(datagram).ok_or(CodecError::Truncated {
        got: datagram.len(),
        needed: IPV4_MIN_HDR_LEN,
    })?;
    if ipv4.get_version() != 4 {
        return Err(CodecError::InvalidIpv4Header);
    }

    let header_len: usize = usize::from(ipv4.get_header_length()) * 4;
    if header_len < IPV4_MIN_HDR_LEN || header_len > datagram.len() {
        return Err(CodecError::InvalidIpv4Header);
    }
    Ok(&datagram[header_len..])
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
