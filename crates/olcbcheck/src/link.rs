//! GridConnect frame link over a byte stream.
//!
//! A spawned reader task decodes GridConnect text into frames and forwards
//! them, in arrival order, over an mpsc channel. The checker drains that
//! channel with a timeout. Sends are encoded and written directly on the
//! caller's task.
//!
//! The link is generic over the stream halves so the same code runs over a
//! tokio TCP socket, an in-memory duplex pipe, or a simulated network.

use std::{io, time::Duration};

use async_trait::async_trait;
use olcbcheck_core::{FrameLink, LinkError};
use olcbcheck_proto::{CanFrame, GridConnectDecoder, gridconnect};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpStream, tcp::OwnedWriteHalf},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

/// Frames buffered between the reader task and the checker.
const INBOUND_CAPACITY: usize = 1024;

/// Bytes requested per read from the stream.
const READ_CHUNK: usize = 512;

/// Frame link speaking GridConnect over a stream.
#[derive(Debug)]
pub struct GridConnectLink<W> {
    inbound: mpsc::Receiver<CanFrame>,
    writer: W,
    reader: JoinHandle<()>,
}

impl GridConnectLink<OwnedWriteHalf> {
    /// Connect to a GridConnect hub over TCP.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the hub cannot be reached.
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        Ok(Self::spawn(reader, writer))
    }
}

impl<W> GridConnectLink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Start the reader task on `reader` and send through `writer`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, inbound) = mpsc::channel(INBOUND_CAPACITY);
        let reader = tokio::spawn(read_frames(reader, tx));
        Self { inbound, writer, reader }
    }
}

impl<W> Drop for GridConnectLink<W> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl<W> FrameLink for GridConnectLink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CanFrame>, LinkError> {
        match tokio::time::timeout(timeout, self.inbound.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(LinkError::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn send_frame(&mut self, frame: CanFrame) -> Result<(), LinkError> {
        let line = gridconnect::encode(&frame);
        trace!(line = line.trim_end(), "writing");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Decode frames from `reader` until it closes or the checker goes away.
async fn read_frames<R>(mut reader: R, tx: mpsc::Sender<CanFrame>)
where
    R: AsyncRead + Unpin,
{
    let mut decoder = GridConnectDecoder::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "hub read failed");
                break;
            },
        };
        decoder.extend(&buf[..n]);

        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                },
                Ok(None) => break,
                Err(err) => warn!(error = %err, "skipping malformed frame"),
            }
        }
    }

    debug!("hub connection closed");
}

#[cfg(test)]
mod tests {
    use tokio::io::{DuplexStream, WriteHalf, duplex};

    use super::*;

    type TestLink = GridConnectLink<WriteHalf<DuplexStream>>;

    fn pair() -> (TestLink, DuplexStream) {
        let (local, remote) = duplex(4096);
        let (reader, writer) = tokio::io::split(local);
        (GridConnectLink::spawn(reader, writer), remote)
    }

    #[tokio::test]
    async fn decodes_frames_written_by_hub() {
        let (mut link, mut hub) = pair();

        hub.write_all(b":X10701005N050101010301;\n:X10700005N;").await.unwrap();

        let first = link.recv_frame(Duration::from_secs(1)).await.unwrap().unwrap();
        let second = link.recv_frame(Duration::from_secs(1)).await.unwrap().unwrap();
        assert!(first.is_amd());
        assert_eq!(first.data(), [0x05, 0x01, 0x01, 0x01, 0x03, 0x01]);
        assert!(second.is_rid());
    }

    #[tokio::test]
    async fn frames_split_across_reads_are_reassembled() {
        let (mut link, mut hub) = pair();

        hub.write_all(b":X1070").await.unwrap();
        hub.flush().await.unwrap();
        tokio::task::yield_now().await;
        hub.write_all(b"0005N;\n").await.unwrap();

        let frame = link.recv_frame(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(frame.header(), 0x1070_0005);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let (mut link, mut hub) = pair();

        hub.write_all(b":XZZZZN;\n:X10700005N;\n").await.unwrap();

        let frame = link.recv_frame(Duration::from_secs(1)).await.unwrap().unwrap();
        assert!(frame.is_rid());
    }

    #[tokio::test]
    async fn sends_encoded_lines() {
        let (mut link, mut hub) = pair();

        link.send_frame(CanFrame::new(0x1070_2001, &[]).unwrap()).await.unwrap();

        let mut buf = vec![0u8; 32];
        let n = hub.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b":X10702001N;\n");
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_hub_times_out() {
        let (mut link, _hub) = pair();

        let frame = link.recv_frame(Duration::from_millis(300)).await.unwrap();
        assert_eq!(frame, None);
    }

    #[tokio::test]
    async fn hub_disconnect_closes_link() {
        let (mut link, hub) = pair();
        drop(hub);

        let result = link.recv_frame(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(LinkError::Closed)));
    }
}
