//! GridConnect hub for turmoil simulations.
//!
//! [`SimHub`] stands in for a GridConnect-over-TCP hub with simulated nodes
//! attached. It accepts a single connection, decodes the frames the checker
//! writes, and writes back whatever the nodes answer. Run it as a turmoil
//! host so the checker's real TCP link can be exercised under simulated
//! latency and time.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
};

use olcbcheck_proto::{GridConnectDecoder, gridconnect};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use turmoil::net::TcpListener;

use crate::sim_node::SimNode;

/// Port the hub listens on by default.
pub const HUB_PORT: u16 = 12021;

/// Simulated GridConnect hub.
#[derive(Debug, Default)]
pub struct SimHub {
    nodes: Vec<SimNode>,
}

impl SimHub {
    /// Create a hub with no nodes attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node behind the hub.
    pub fn with_node(mut self, node: SimNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Accept one connection on `port` and serve it until the peer closes.
    ///
    /// # Errors
    ///
    /// Returns any socket error. Malformed input is logged and skipped.
    pub async fn serve(mut self, port: u16) -> io::Result<()> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
        let (mut stream, peer) = listener.accept().await?;
        debug!(%peer, "checker connected");

        let mut decoder = GridConnectDecoder::new();
        let mut buf = [0u8; 256];

        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                debug!(%peer, "checker disconnected");
                return Ok(());
            }
            decoder.extend(&buf[..n]);

            loop {
                let frame = match decoder.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "dropping malformed frame");
                        continue;
                    },
                };

                for node in &mut self.nodes {
                    for reply in node.on_frame(&frame) {
                        stream.write_all(gridconnect::encode(&reply).as_bytes()).await?;
                    }
                }
            }
        }
    }
}
