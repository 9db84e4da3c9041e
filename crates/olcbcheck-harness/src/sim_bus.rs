//! In-memory CAN segment populated by simulated nodes.
//!
//! [`SimBus`] is a [`FrameLink`] whose far side is a set of [`SimNode`]s.
//! Every frame the checker sends is offered to each node in turn, and their
//! replies are queued for the checker to read. Frames the nodes send are not
//! offered to the other nodes, so bystanders never react to the target.
//!
//! Reads on an empty queue sleep for the full timeout, so tests should run on
//! paused tokio time.

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use olcbcheck_core::{FrameLink, LinkError};
use olcbcheck_proto::{CanFrame, NodeId};
use tracing::trace;

use crate::sim_node::SimNode;

/// Simulated segment of nodes behind a frame link.
#[derive(Debug, Default)]
pub struct SimBus {
    nodes: Vec<SimNode>,
    pending: VecDeque<CanFrame>,
    sent: Vec<CanFrame>,
}

impl SimBus {
    /// Create an empty segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node. Nodes answer in the order they were attached.
    pub fn with_node(mut self, node: SimNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Queue frames that are already on the bus before the check starts.
    pub fn with_backlog(mut self, frames: impl IntoIterator<Item = CanFrame>) -> Self {
        self.pending.extend(frames);
        self
    }

    /// Look up an attached node by ID.
    pub fn node(&self, node_id: NodeId) -> Option<&SimNode> {
        self.nodes.iter().find(|node| node.node_id() == node_id)
    }

    /// Frames the checker has sent, in order.
    pub fn sent(&self) -> &[CanFrame] {
        &self.sent
    }
}

#[async_trait]
impl FrameLink for SimBus {
    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CanFrame>, LinkError> {
        match self.pending.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            },
        }
    }

    async fn send_frame(&mut self, frame: CanFrame) -> Result<(), LinkError> {
        for node in &mut self.nodes {
            let replies = node.on_frame(&frame);
            trace!(node = %node.node_id(), replies = replies.len(), "node reacted");
            self.pending.extend(replies);
        }
        self.sent.push(frame);
        Ok(())
    }
}
