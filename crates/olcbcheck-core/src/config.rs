//! Check configuration.

use std::time::Duration;

use olcbcheck_proto::{Alias, NodeId};

/// Collision check configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Node under test. When unset, the first node to answer the opening
    /// enquiry becomes the target.
    pub target: Option<NodeId>,
    /// Longest wait for a single frame before the bus counts as quiet
    pub read_timeout: Duration,
    /// Longest time any one phase may run, however busy the bus is
    pub phase_budget: Duration,
    /// Source alias of the checker's own enquiries; must not belong to a node
    pub query_alias: Alias,
}

impl CheckerConfig {
    /// Default configuration aimed at a specific node.
    pub fn for_target(target: NodeId) -> Self {
        Self { target: Some(target), ..Self::default() }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            target: None,
            read_timeout: Duration::from_millis(300),
            phase_budget: Duration::from_secs(10),
            query_alias: Alias::QUERY,
        }
    }
}
