//! Command-line front end for the OpenLCB alias collision check.
//!
//! Connects to a GridConnect hub over TCP, runs one check against the
//! target node, and maps the verdict to a process exit code.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod error;
pub mod link;

pub use cli::Args;
pub use error::RunError;
pub use link::GridConnectLink;
use olcbcheck_core::{CheckReport, run_and_report};
use tracing::info;

/// Connect to the hub named in `args` and run one check.
///
/// # Errors
///
/// Returns [`RunError::Connect`] if the hub cannot be reached, otherwise the
/// check's own failure.
pub async fn run(args: &Args) -> Result<CheckReport, RunError> {
    let mut link = GridConnectLink::connect(&args.host, args.port).await.map_err(|source| {
        RunError::Connect { host: args.host.clone(), port: args.port, source }
    })?;
    info!(host = %args.host, port = args.port, "connected to hub");

    let report = run_and_report(&mut link, &args.checker_config()).await?;
    Ok(report)
}
