//! Connection management.

use crate::error::{ClientError, ReceiveError, SendError};
use crate::handler::HandlerPolicy;
use crate::stream::{ClientStream, Endpoint};
use bytes::Bytes;
use glonax_protocol::{Frame, Header, MessageType, FRAME_HEADER_SIZE, PROTOCOL_VERSION};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{broadcast, Mutex};

/// Default user agent announced in the session message.
pub const DEFAULT_USER_AGENT: &str = concat!("glonax-client/", env!("CARGO_PKG_VERSION"));

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// `host:port` or `unix:/path`.
    pub address: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Maximum time to wait for one complete frame, if any.
    pub read_timeout: Option<Duration>,
    /// Wire version written to and expected in every header.
    pub protocol_version: u8,
    /// User agent for the session announcement.
    pub user_agent: String,
    /// Dispatch loop reaction to handler errors.
    pub handler_policy: HandlerPolicy,
}

impl ConnectionConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            protocol_version: PROTOCOL_VERSION,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            handler_policy: HandlerPolicy::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_protocol_version(mut self, version: u8) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_handler_policy(mut self, policy: HandlerPolicy) -> Self {
        self.handler_policy = policy;
        self
    }
}

/// An open stream to a Glonax control unit.
///
/// One task may read at a time; any number of tasks may send. Header and
/// payload of a frame are written under one lock and never interleave.
pub struct Connection {
    config: ConnectionConfig,
    /// Write half of the stream.
    writer: Mutex<Option<WriteHalf<ClientStream>>>,
    /// Read half of the stream.
    reader: Mutex<Option<ReadHalf<ClientStream>>>,
    /// Set once, by the first close.
    closed: AtomicBool,
    /// Wakes pending reads on close.
    shutdown: broadcast::Sender<()>,
}

impl Connection {
    /// Opens the socket. No protocol exchange happens here.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        let endpoint = Endpoint::parse(&config.address)
            .ok_or_else(|| ClientError::InvalidAddress(config.address.clone()))?;

        tracing::debug!("Connecting to {}", config.address);

        let stream = tokio::time::timeout(config.connect_timeout, ClientStream::connect(&endpoint))
            .await
            .map_err(|_| {
                tracing::debug!("Connection timeout");
                ClientError::Timeout
            })?
            .map_err(|e| {
                tracing::debug!("Connection failed: {}", e);
                ClientError::Io(e)
            })?;

        tracing::debug!("Connected to {}", config.address);

        Ok(Self::from_stream(config, stream))
    }

    /// Wraps an already open stream.
    pub fn from_stream(config: ConnectionConfig, stream: ClientStream) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            writer: Mutex::new(Some(write_half)),
            reader: Mutex::new(Some(read_half)),
            closed: AtomicBool::new(false),
            shutdown,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Sends one frame.
    ///
    /// A write blocked on a peer that stopped reading is abandoned with
    /// `ConnectionClosed` when the connection is closed.
    pub async fn send(&self, message_type: MessageType, payload: Bytes) -> Result<(), SendError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        if self.is_closed() {
            return Err(SendError::ConnectionClosed);
        }

        let encoded = Frame::new(message_type, payload).encode(self.config.protocol_version)?;

        let write = async {
            let mut writer_guard = self.writer.lock().await;
            let writer = writer_guard.as_mut().ok_or(SendError::ConnectionClosed)?;
            writer.write_all(&encoded).await?;
            writer.flush().await?;
            Ok::<_, SendError>(())
        };

        // Dropping the write future releases the writer lock for close()
        tokio::select! {
            result = write => result?,
            _ = shutdown_rx.recv() => return Err(SendError::ConnectionClosed),
        }

        tracing::debug!("Sent {} frame ({} bytes)", message_type, encoded.len());
        Ok(())
    }

    /// Receives one complete frame.
    ///
    /// Any error closes the connection: after a partial or malformed frame
    /// the stream cannot be resynchronized.
    pub async fn receive(&self) -> Result<(MessageType, Bytes), ReceiveError> {
        let result = self.receive_frame().await;
        match &result {
            Ok((message_type, payload)) => {
                tracing::debug!("Received {} frame ({} bytes)", message_type, payload.len());
            }
            Err(e) => {
                tracing::debug!("Receive failed: {}", e);
                self.close().await;
            }
        }
        result
    }

    async fn receive_frame(&self) -> Result<(MessageType, Bytes), ReceiveError> {
        // Subscribe before checking the flag so a concurrent close is never missed
        let mut shutdown_rx = self.shutdown.subscribe();
        if self.is_closed() {
            return Err(ReceiveError::ConnectionClosed);
        }

        let read = async {
            let mut reader_guard = self.reader.lock().await;
            let reader = reader_guard.as_mut().ok_or(ReceiveError::ConnectionClosed)?;

            let mut header = [0u8; FRAME_HEADER_SIZE];
            read_exact(reader, &mut header).await?;
            let header = Header::decode(&header, self.config.protocol_version)?;

            let mut payload = vec![0u8; header.payload_len as usize];
            read_exact(reader, &mut payload).await?;

            Ok::<_, ReceiveError>((header.message_type, Bytes::from(payload)))
        };

        let read = async {
            match self.config.read_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, read).await {
                    Ok(result) => result,
                    Err(_) => Err(ReceiveError::Timeout),
                },
                None => read.await,
            }
        };

        tokio::select! {
            result = read => result,
            _ = shutdown_rx.recv() => Err(ReceiveError::ConnectionClosed),
        }
    }

    /// Returns whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the connection and releases the socket. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::debug!("Closing connection to {}", self.config.address);

        // Wake any pending read so it releases the reader lock
        let _ = self.shutdown.send(());

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        let _ = self.reader.lock().await.take();

        tracing::debug!("Connection closed");
    }
}

async fn read_exact(reader: &mut ReadHalf<ClientStream>, buf: &mut [u8]) -> Result<(), ReceiveError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ) =>
        {
            Err(ReceiveError::ConnectionClosed)
        }
        Err(e) => Err(ReceiveError::Io(e)),
    }
}
