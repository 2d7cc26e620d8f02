//! Connection handshake: echo probe, session announce, instance exchange.

use crate::connection::Connection;
use crate::error::{HandshakeError, ReceiveError};
use glonax_protocol::{Echo, Instance, MessageType, Session};
use std::time::{Duration, Instant};

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Socket open, nothing exchanged.
    Connected,
    /// Echo sent, waiting for the reply.
    Probing,
    /// Session sent, waiting for the instance.
    Announcing,
    Established,
    /// A step failed; the connection has been closed.
    Faulted,
}

/// Result of a completed handshake.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub instance: Instance,
    /// Round trip time of the echo probe.
    pub latency: Duration,
}

/// Drives the handshake over one connection. Never retried: a faulted
/// handshake requires a fresh connection.
pub struct Handshake<'a> {
    conn: &'a Connection,
    probe: Echo,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            probe: Echo::random(),
            state: HandshakeState::Connected,
        }
    }

    /// Uses a fixed probe payload instead of random bytes.
    pub fn with_probe(mut self, probe: Echo) -> Self {
        self.probe = probe;
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Runs all steps. On failure the state becomes `Faulted` and the
    /// connection is closed.
    pub async fn run(&mut self) -> Result<HandshakeOutcome, HandshakeError> {
        match self.steps().await {
            Ok(outcome) => {
                self.state = HandshakeState::Established;
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!("Handshake failed in state {:?}: {}", self.state, e);
                self.state = HandshakeState::Faulted;
                self.conn.close().await;
                Err(e)
            }
        }
    }

    async fn steps(&mut self) -> Result<HandshakeOutcome, HandshakeError> {
        self.state = HandshakeState::Probing;
        let latency = probe(self.conn, self.probe).await?;
        tracing::debug!("Connection latency: {:.2?}", latency);

        self.state = HandshakeState::Announcing;
        let session = Session::new(self.conn.config().user_agent.clone());
        self.conn.send(MessageType::Session, session.encode()).await?;

        let (message_type, payload) = self.conn.receive().await?;
        if message_type != MessageType::Instance {
            return Err(HandshakeError::UnexpectedMessage {
                expected: MessageType::Instance,
                actual: message_type,
            });
        }
        let instance = Instance::decode(&payload).map_err(ReceiveError::from)?;

        tracing::debug!("Instance ID: {}", instance.id);
        tracing::debug!("Instance model: {}", instance.model);
        tracing::debug!("Instance type: {}", instance.machine_type);
        tracing::debug!("Instance version: {}", instance.version_string());
        tracing::debug!("Instance serial number: {}", instance.serial_number);

        Ok(HandshakeOutcome { instance, latency })
    }
}

/// Sends an echo and waits for the identical reply, returning the round
/// trip time.
pub async fn probe(conn: &Connection, echo: Echo) -> Result<Duration, HandshakeError> {
    let start = Instant::now();
    conn.send(MessageType::Echo, echo.encode()).await?;

    let (message_type, payload) = conn.receive().await?;
    let latency = start.elapsed();

    if message_type != MessageType::Echo {
        return Err(HandshakeError::UnexpectedMessage {
            expected: MessageType::Echo,
            actual: message_type,
        });
    }

    let reply = Echo::decode(&payload).map_err(ReceiveError::from)?;
    if reply != echo {
        return Err(HandshakeError::EchoMismatch {
            sent: echo.data,
            received: reply.data,
        });
    }

    Ok(latency)
}
