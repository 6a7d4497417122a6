//! # quickping core
//!
//! The echo-probe engine: resolve each target, fan out one ICMP echo probe
//! per resolved address, and hand every outcome to a reporter.
//!
//! * **[`resolver`]**: name to classified addresses.
//! * **[`network`]**: raw ICMP sockets behind a small trait seam.
//! * **[`prober`]**: one request, one bounded wait, one outcome.
//! * **[`dispatcher`]**: sequential over targets, concurrent over addresses.
//! * **[`reporter`]**: outcomes to `tracing`.

pub mod dispatcher;
pub mod network;
pub mod prober;
pub mod reporter;
pub mod resolver;
