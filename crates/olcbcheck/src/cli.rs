//! Command-line arguments.

use std::time::Duration;

use clap::{ArgAction, Parser};
use olcbcheck_core::CheckerConfig;
use olcbcheck_proto::NodeId;

/// Check how an OpenLCB node reacts when another node claims its alias.
#[derive(Debug, Clone, Parser)]
#[command(name = "olcbcheck", version)]
pub struct Args {
    /// GridConnect hub host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// GridConnect hub TCP port
    #[arg(long, default_value_t = 12021)]
    pub port: u16,

    /// Node to check, e.g. 05.01.01.01.03.01; defaults to the first node
    /// that answers the enquiry
    #[arg(long, value_name = "NODE_ID")]
    pub target_node_id: Option<NodeId>,

    /// How long a single read waits for a frame, in milliseconds
    #[arg(long, default_value_t = 300)]
    pub read_timeout_ms: u64,

    /// Upper bound on the time spent in any one phase, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub phase_budget_ms: u64,

    /// Log more detail (-v for frames, -vv for everything); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Checker configuration described by these arguments.
    pub fn checker_config(&self) -> CheckerConfig {
        CheckerConfig {
            target: self.target_node_id,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            phase_budget: Duration::from_millis(self.phase_budget_ms),
            ..CheckerConfig::default()
        }
    }

    /// Default log filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "info,olcbcheck=debug,olcbcheck_core=debug",
            _ => "trace",
        }
    }
}
