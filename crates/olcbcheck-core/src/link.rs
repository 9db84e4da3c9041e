//! Frame link abstraction.
//!
//! A link is the checker's only view of the bus: a FIFO of received frames
//! with a bounded wait, and a fire-and-forget send. Production uses a TCP
//! connection to a GridConnect hub; tests use scripted or simulated links.

use std::time::Duration;

use async_trait::async_trait;
use olcbcheck_proto::CanFrame;
use tokio::sync::mpsc;

use crate::error::LinkError;

/// Bidirectional access to a CAN segment.
///
/// Implementations MUST deliver received frames in arrival order. The
/// checker's "first AMD wins" rule and its AMD counting both depend on it.
#[async_trait]
pub trait FrameLink: Send {
    /// Wait up to `timeout` for the next received frame.
    ///
    /// Returns `Ok(None)` if nothing arrived in time. That is the normal
    /// "bus is quiet" signal, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Closed`] once the bus can deliver nothing more.
    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CanFrame>, LinkError>;

    /// Queue a frame for transmission.
    ///
    /// No acknowledgement is awaited; the frame must be on its way before the
    /// next `recv_frame` begins.
    async fn send_frame(&mut self, frame: CanFrame) -> Result<(), LinkError>;
}

/// Link backed by a pair of tokio channels.
///
/// The receive side is fed by whatever task captures bus traffic; the send
/// side is drained by whatever task writes to the bus.
#[derive(Debug)]
pub struct ChannelLink {
    inbound: mpsc::Receiver<CanFrame>,
    outbound: mpsc::Sender<CanFrame>,
}

impl ChannelLink {
    /// Wrap an inbound receiver and an outbound sender.
    pub fn new(inbound: mpsc::Receiver<CanFrame>, outbound: mpsc::Sender<CanFrame>) -> Self {
        Self { inbound, outbound }
    }
}

#[async_trait]
impl FrameLink for ChannelLink {
    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CanFrame>, LinkError> {
        match tokio::time::timeout(timeout, self.inbound.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(LinkError::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn send_frame(&mut self, frame: CanFrame) -> Result<(), LinkError> {
        self.outbound.send(frame).await.map_err(|_| LinkError::Closed)
    }
}
