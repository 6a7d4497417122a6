use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};
use quickping_common::config::{self, Config};
use quickping_common::network::target::Target;

#[derive(Parser, Debug)]
#[command(name = "quickping", version)]
#[command(about = "Send one ICMP echo request to every address a host resolves to.")]
pub struct CommandLine {
    /// Time to wait for a reply (e.g. 5s, 500ms, 1m)
    #[arg(short, long, default_value = "5s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Listen address for IPv4 sockets
    #[arg(long, default_value = "0.0.0.0")]
    pub listen4: Ipv4Addr,

    /// Listen address for IPv6 sockets
    #[arg(long, default_value = "::")]
    pub listen6: Ipv6Addr,

    /// Data to send in the request, as hex bytes
    #[arg(short, long, value_name = "HEX")]
    pub data: Option<HexBytes>,

    /// More log output, repeat for trace
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less log output, repeat to show errors only
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Hostnames or IP addresses to ping
    #[arg(value_name = "ADDR", required = true)]
    pub targets: Vec<Target>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        Config {
            timeout: self.timeout,
            listen4: self.listen4,
            listen6: self.listen6,
            payload: self.data.clone().map(|data| data.0).unwrap_or_default(),
            identifier: config::process_identifier(),
        }
    }

    /// Default log level, before `RUST_LOG` gets a say.
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (0, 0) => "info",
            (1, _) => "debug",
            (v, _) if v > 1 => "trace",
            (_, 1) => "warn",
            _ => "error",
        }
    }
}

/// A payload given as hex, e.g. `deadbeef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim())
            .map(HexBytes)
            .map_err(|e| format!("invalid hex data {s:?}: {e}"))
    }
}

/// Parses `250us`, `500ms`, `5s`, `1.5s`, `1m` or `1h`. A bare number is
/// taken as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value: &str = value.trim();
    let split: usize = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration {value:?}: expected a number followed by a unit"))?;
    let nanos_per_unit: f64 = match unit {
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "" | "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        other => return Err(format!("invalid duration unit {other:?}; use us, ms, s, m or h")),
    };

    let nanos: f64 = (number * nanos_per_unit).round();
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(format!("duration {value:?} is out of range"));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
