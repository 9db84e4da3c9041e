//! `olcbcheck` binary.

use std::process::ExitCode;

use clap::Parser;
use olcbcheck::{Args, error::EXIT_PASS, run};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&args).await {
        Ok(_) => ExitCode::from(EXIT_PASS),
        Err(err) => {
            error!("Failure - {err}");
            ExitCode::from(err.exit_code())
        },
    }
}
