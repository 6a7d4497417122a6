use std::fmt;

use anyhow::Context;
use colored::*;
use quickping_core::reporter::OUTCOME_TARGET;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) -> anyhow::Result<()> {
    let filter: EnvFilter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(QuickpingFormatter)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("installing log subscriber")
}

pub struct QuickpingFormatter;

impl<S, N> FormatEvent<S, N> for QuickpingFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
            Level::TRACE => ("[ ]", |s| s.dimmed()),
            Level::DEBUG => ("[?]", |s| s.blue()),
            Level::INFO => ("[+]", |s| s.green().bold()),
            Level::WARN => ("[*]", |s| s.yellow().bold()),
            Level::ERROR => ("[-]", |s| s.red().bold()),
        };

        write!(writer, "{} ", color_func(symbol.into()))?;

        if meta.target() == OUTCOME_TARGET {
            let mut line = OutcomeLine::default();
            event.record(&mut line);
            write!(writer, "{line}")?;
        } else {
            ctx.field_format().format_fields(writer.by_ref(), event)?;
        }

        writeln!(writer)
    }
}

/// The fields of an outcome event, rendered as
/// `[target] addr: message in duration`, with `error: ...` in place of the
/// message for failures.
#[derive(Debug, Default, PartialEq, Eq)]
struct OutcomeLine {
    target: Option<String>,
    addr: Option<String>,
    message: String,
    duration: Option<String>,
    error: Option<String>,
}

impl Visit for OutcomeLine {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value: String = format!("{value:?}");
        match field.name() {
            "target" => self.target = Some(value),
            "addr" => self.addr = Some(value),
            "message" => self.message = value,
            "duration" => self.duration = Some(value),
            "error" => self.error = Some(value),
            _ => {}
        }
    }
}

impl fmt::Display for OutcomeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(target) = &self.target {
            write!(f, "[{}] ", target.bold())?;
        }
        if let Some(addr) = &self.addr {
            write!(f, "{}: ", addr.cyan())?;
        }
        match (&self.error, &self.duration) {
            (Some(error), Some(duration)) => write!(f, "error: {error} in {}", duration.yellow()),
            (Some(error), None) => write!(f, "error: {error}"),
            (None, Some(duration)) => write!(f, "{} in {}", self.message, duration.yellow()),
            (None, None) => f.write_str(&self.message),
        }
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
