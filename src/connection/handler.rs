//! Per-Connection Handler
//!
//! Each client gets its own task running a read, decode, execute, respond
//! loop. TCP is a stream protocol, so a single read may carry half a frame
//! or several frames; a `BytesMut` buffer accumulates incoming bytes and
//! the decoder drains every complete command from it before the next read.
//!
//! A malformed frame is reported to the client as an error reply and the
//! connection stays open; the buffered bytes are discarded so the stream
//! can resynchronize on the next frame boundary.

use crate::commands::Dispatcher;
use crate::protocol::{decode_command, Reply};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Shared counters for connection handling.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors that can end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("client disconnected")]
    ClientDisconnected,

    /// The stream ended mid-frame
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The read buffer limit was exceeded by a single frame
    #[error("buffer size limit exceeded")]
    BufferFull,
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// Buffered writer over the TCP stream
    stream: BufWriter<TcpStream>,

    /// Client address, for logging
    addr: SocketAddr,

    /// Accumulated incoming bytes, including any partial trailing frame
    buffer: BytesMut,

    /// Executes decoded commands against the shared store
    dispatcher: Dispatcher,

    /// Shared connection counters
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            dispatcher,
            stats,
        }
    }

    /// Runs the connection to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "client disconnected"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "client disconnected")
            }
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The read, decode, execute, respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.drain_buffer().await?;
            self.read_more_data().await?;
        }
    }

    /// Decodes and executes every complete command currently buffered.
    ///
    /// Pipelined requests fall out naturally here: a single read that
    /// carried several frames produces several replies before the next
    /// read happens.
    async fn drain_buffer(&mut self) -> Result<(), ConnectionError> {
        loop {
            match decode_command(&self.buffer) {
                Ok(Some((command, consumed))) => {
                    self.buffer.advance(consumed);
                    trace!(client = %self.addr, %command, "decoded command");

                    let reply = self.dispatcher.execute(command);
                    self.stats.command_processed();
                    self.send_reply(&reply).await?;
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "protocol decode error");

                    // Report the malformed frame and stay open. The buffered
                    // bytes cannot be trusted for framing anymore, so drop
                    // them and resynchronize on the next read.
                    self.buffer.clear();
                    self.send_reply(&Reply::error(e.to_string())).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(client = %self.addr, size = self.buffer.len(), "buffer limit exceeded");
            return Err(ConnectionError::BufferFull);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                // The peer hung up mid-frame.
                Err(ConnectionError::UnexpectedEof)
            };
        }

        trace!(client = %self.addr, bytes = n, "read data");
        Ok(())
    }

    /// Serializes and sends one reply.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        trace!(client = %self.addr, bytes = bytes.len(), "sent reply");
        Ok(())
    }
}

/// Runs a client connection to completion, logging terminal errors.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Dispatcher,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Arc<Store>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Store::new();
        let stats = Arc::new(ConnectionStats::new());

        let accept_store = Arc::clone(&store);
        let accept_stats = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let dispatcher = Dispatcher::new(Arc::clone(&accept_store));
                let stats = Arc::clone(&accept_stats);
                tokio::spawn(handle_connection(stream, client_addr, dispatcher, stats));
            }
        });

        (addr, store, stats)
    }

    async fn read_reply(client: &mut TcpStream, expected_len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; 256];
        let mut total = 0;
        while total < expected_len {
            let n = client.read(&mut buf[total..]).await.unwrap();
            assert!(n > 0, "connection closed early");
            total += n;
        }
        buf.truncate(total);
        buf
    }

    #[tokio::test]
    async fn set_then_get_over_socket() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$5\r\nember\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 5).await, b"+OK\r\n");

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 11).await, b"$5\r\nember\r\n");
    }

    #[tokio::test]
    async fn get_missing_returns_null_bulk() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$7\r\nmissing\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 5).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn pipelined_commands_in_one_write() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(
                b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n\
                  *3\r\n$3\r\nSET\r\n$2\r\nk2\r\n$2\r\nv2\r\n\
                  *2\r\n$3\r\nGET\r\n$2\r\nk1\r\n\
                  *2\r\n$3\r\nGET\r\n$2\r\nk2\r\n",
            )
            .await
            .unwrap();

        // +OK\r\n +OK\r\n $2\r\nv1\r\n $2\r\nv2\r\n
        let reply = read_reply(&mut client, 26).await;
        assert_eq!(reply, b"+OK\r\n+OK\r\n$2\r\nv1\r\n$2\r\nv2\r\n");
    }

    #[tokio::test]
    async fn command_split_across_writes() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*2\r\n$3\r\nGE").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.write_all(b"T\r\n$1\r\nk\r\n").await.unwrap();

        assert_eq!(read_reply(&mut client, 5).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn unknown_command_over_socket() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*1\r\n$5\r\nHELLO\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 22).await, b"-ERR unknown command\r\n");
    }

    #[tokio::test]
    async fn decode_error_keeps_connection_open() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // An integer where a bulk string belongs is a protocol error.
        client.write_all(b"*1\r\n:42\r\n").await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"-ERR"), "expected an error reply");

        // The same connection still serves well-formed commands.
        client
            .write_all(b"*2\r\n$4\r\nINCR\r\n$1\r\nc\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 4).await, b":1\r\n");
    }

    #[tokio::test]
    async fn stats_track_connections_and_commands() {
        let (addr, _, stats) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n")
            .await
            .unwrap();
        let _ = read_reply(&mut client, 5).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);
        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);

        drop(client);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
