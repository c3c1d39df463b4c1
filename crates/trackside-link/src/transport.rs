//! Byte transports that deliver whole LLRP frames.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use trackside_errors::{ReaderError, ReaderResult};
use trackside_llrp_protocol::frame_length;

/// A bidirectional frame channel to one reader.
#[async_trait::async_trait]
pub trait FrameTransport: Send {
    /// Write one complete frame.
    async fn write_frame(&mut self, frame: &[u8]) -> ReaderResult<()>;

    /// Read one complete frame.
    ///
    /// Must be cancel safe: dropping the future mid-frame keeps the bytes
    /// received so far for the next call.
    /// A header that cannot be parsed is a transport error, since no later
    /// frame boundary can be trusted.
    async fn read_frame(&mut self) -> ReaderResult<Vec<u8>>;

    /// Close the channel. Closing twice is not an error.
    async fn close(&mut self) -> ReaderResult<()>;

    /// Peer description for logs.
    fn peer(&self) -> String;
}

/// Opens transports to reader endpoints.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Transport: FrameTransport + 'static;

    async fn connect(&self, endpoint: &str, timeout: Duration) -> ReaderResult<Self::Transport>;
}

/// LLRP over TCP.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    buffer: Vec<u8>,
    max_frame_bytes: usize,
    peer: String,
    closed: bool,
    framing_lost: bool,
}

impl TcpTransport {
    const READ_CHUNK: usize = 4096;

    pub fn new(stream: TcpStream, max_frame_bytes: usize) -> Self {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            stream,
            buffer: Vec::with_capacity(Self::READ_CHUNK),
            max_frame_bytes,
            peer,
            closed: false,
            framing_lost: false,
        }
    }

    /// A bad header leaves no way to find the next frame boundary, so it
    /// poisons the connection instead of failing a single message.
    fn take_buffered_frame(&mut self) -> ReaderResult<Option<Vec<u8>>> {
        let length = match frame_length(&self.buffer, self.max_frame_bytes) {
            Ok(length) => length,
            Err(e) => {
                self.buffer.clear();
                self.framing_lost = true;
                return Err(ReaderError::transport(format!(
                    "lost framing from {}: {e}",
                    self.peer
                )));
            }
        };
        match length {
            Some(len) if self.buffer.len() >= len => Ok(Some(self.buffer.drain(..len).collect())),
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl FrameTransport for TcpTransport {
    async fn write_frame(&mut self, frame: &[u8]) -> ReaderResult<()> {
        if self.closed {
            return Err(ReaderError::transport("write on closed connection"));
        }
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> ReaderResult<Vec<u8>> {
        if self.framing_lost {
            return Err(ReaderError::transport(format!(
                "framing lost from {}",
                self.peer
            )));
        }
        loop {
            if let Some(frame) = self.take_buffered_frame()? {
                return Ok(frame);
            }
            if self.closed {
                return Err(ReaderError::transport("read on closed connection"));
            }
            let mut chunk = [0u8; Self::READ_CHUNK];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(ReaderError::transport(format!(
                    "connection closed by {}",
                    self.peer
                )));
            }
            self.buffer.extend_from_slice(chunk.get(..n).unwrap_or_default());
        }
    }

    async fn close(&mut self) -> ReaderResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(peer = %self.peer, "Closing reader connection");
        self.stream.shutdown().await?;
        Ok(())
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

/// Dials readers over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    max_frame_bytes: usize,
}

impl TcpConnector {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(trackside_llrp_protocol::MAX_FRAME_BYTES)
    }
}

#[async_trait::async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self, endpoint: &str, timeout: Duration) -> ReaderResult<TcpTransport> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(endpoint))
            .await
            .map_err(|elapsed| {
                debug!(%endpoint, %elapsed, "Connect timed out");
                ReaderError::timeout(format!("connect to {endpoint}"), timeout)
            })?
            .map_err(|e| ReaderError::transport(format!("connect to {endpoint}: {e}")))?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport::new(stream, self.max_frame_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use trackside_llrp_protocol::{Envelope, Message};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn test_frames_split_across_writes_are_reassembled() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let first = Envelope::new(1, Message::Keepalive).encode()?;
        let second = Envelope::new(2, Message::StartRoSpec { ro_spec_id: 9 }).encode()?;
        let mut wire = first.clone();
        wire.extend_from_slice(&second);

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let (a, b) = wire.split_at(13);
            socket.write_all(a).await?;
            socket.flush().await?;
            tokio::time::sleep(Duration::from_millis(20)).await;
            socket.write_all(b).await?;
            socket.flush().await?;
            Ok::<_, std::io::Error>(socket)
        });

        let mut transport = TcpConnector::default()
            .connect(&addr, Duration::from_secs(2))
            .await?;
        assert_eq!(transport.read_frame().await?, first);
        assert_eq!(transport.read_frame().await?, second);
        let _socket = server.await??;
        transport.close().await?;
        transport.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_peer_close_is_transport_error() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let server = tokio::spawn(async move {
            let accepted = listener.accept().await;
            drop(accepted);
        });
        let mut transport = TcpConnector::default()
            .connect(&addr, Duration::from_secs(2))
            .await?;
        server.await?;
        let result = transport.read_frame().await;
        assert!(matches!(result, Err(ReaderError::Transport(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let header = trackside_llrp_protocol::MessageHeader::new(61, 1_000_000, 1).encode();
            socket.write_all(&header).await?;
            socket.flush().await?;
            Ok::<_, std::io::Error>(socket)
        });
        let mut transport = TcpConnector::new(1024)
            .connect(&addr, Duration::from_secs(2))
            .await?;
        let result = transport.read_frame().await;
        assert!(matches!(result, Err(ReaderError::Transport(_))));
        let _socket = server.await??;
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_header_poisons_the_connection() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            socket.write_all(&[0x00, 0x3e, 0, 0, 0, 10, 0, 0, 0, 1]).await?;
            socket.write_all(&Envelope::new(2, Message::Keepalive).encode()?).await?;
            socket.flush().await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(socket)
        });
        let mut transport = TcpConnector::default()
            .connect(&addr, Duration::from_secs(2))
            .await?;
        let _socket = server.await?.map_err(|e| e.to_string())?;

        let first = tokio::time::timeout(Duration::from_secs(2), transport.read_frame()).await?;
        assert!(matches!(first, Err(ReaderError::Transport(_))));
        // The keepalive after the bad header is never surfaced
        let second = tokio::time::timeout(Duration::from_secs(2), transport.read_frame()).await?;
        assert!(matches!(second, Err(ReaderError::Transport(_))));
        transport.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_refused_connection() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        drop(listener);
        let result = TcpConnector::default()
            .connect(&addr, Duration::from_secs(2))
            .await;
        assert!(matches!(result, Err(ReaderError::Transport(_))));
        Ok(())
    }
}
