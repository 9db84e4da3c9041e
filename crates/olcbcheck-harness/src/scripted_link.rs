//! Frame link that replays a fixed script.
//!
//! [`ScriptedLink`] does not model any node. Each frame the checker sends
//! releases the next batch of scripted replies, which makes it the tool for
//! exact frame sequences: wrong frame types, out-of-order replies, or frames
//! no real node would produce.

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use olcbcheck_core::{FrameLink, LinkError};
use olcbcheck_proto::CanFrame;

/// Link that answers each sent frame with the next scripted batch.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    pending: VecDeque<CanFrame>,
    batches: VecDeque<Vec<CanFrame>>,
    sent: Vec<CanFrame>,
    close_after_script: bool,
}

impl ScriptedLink {
    /// Create a link with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames readable before anything is sent.
    pub fn backlog(mut self, frames: impl IntoIterator<Item = CanFrame>) -> Self {
        self.pending.extend(frames);
        self
    }

    /// Append the batch released by the next sent frame.
    ///
    /// An empty batch lets one send pass without a reply.
    pub fn then_reply(mut self, frames: impl IntoIterator<Item = CanFrame>) -> Self {
        self.batches.push_back(frames.into_iter().collect());
        self
    }

    /// Report the link as closed once the script and backlog run dry.
    pub fn close_when_done(mut self) -> Self {
        self.close_after_script = true;
        self
    }

    /// Frames the checker has sent, in order.
    pub fn sent(&self) -> &[CanFrame] {
        &self.sent
    }

    /// Scripted batches not yet released.
    pub fn remaining_batches(&self) -> usize {
        self.batches.len()
    }
}

#[async_trait]
impl FrameLink for ScriptedLink {
    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CanFrame>, LinkError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        if self.close_after_script && self.batches.is_empty() {
            return Err(LinkError::Closed);
        }

        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn send_frame(&mut self, frame: CanFrame) -> Result<(), LinkError> {
        self.sent.push(frame);
        if let Some(batch) = self.batches.pop_front() {
            self.pending.extend(batch);
        }
        Ok(())
    }
}
