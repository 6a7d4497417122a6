mod commands;
mod terminal;

use std::sync::Arc;

use commands::CommandLine;
use quickping_common::outcome::TargetReport;
use quickping_core::dispatcher::Dispatcher;
use terminal::logging;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.log_level())?;

    if !is_root::is_root() {
        warn!("Not running as root, raw ICMP sockets will likely be refused");
    }

    let cfg = Arc::new(commands.config());
    debug!(timeout = ?cfg.timeout, payload = cfg.payload.len(), "starting");

    let dispatcher = Dispatcher::system(cfg);
    let reports: Vec<TargetReport> = dispatcher.run_all(commands.targets).await;

    let failures: usize = reports.iter().map(TargetReport::failure_count).sum();
    debug!(targets = reports.len(), failures, "done");
    Ok(())
}
