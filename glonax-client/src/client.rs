//! High-level client API and dispatch loop.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::{ClientError, ReceiveError, SendError};
use crate::handler::{Handler, HandlerPolicy};
use crate::handshake::{self, Handshake, HandshakeState};
use glonax_protocol::{Control, Echo, Instance, Message, MessageType, Request};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// High-level client for a Glonax control unit.
///
/// Only exists in the established state. Share it with `Arc` to send
/// control commands while another task runs [`Client::listen`].
pub struct Client {
    conn: Connection,
    instance: Instance,
    latency: Duration,
    listening: AtomicBool,
}

impl Client {
    /// Connects and performs the handshake.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        let conn = Connection::connect(config).await?;
        Self::establish(conn).await
    }

    /// Performs the handshake over an open connection.
    pub async fn establish(conn: Connection) -> Result<Self, ClientError> {
        let outcome = Handshake::new(&conn).run().await?;

        tracing::info!(
            "Connected to {} ({})",
            outcome.instance,
            conn.config().address
        );

        Ok(Self {
            conn,
            instance: outcome.instance,
            latency: outcome.latency,
            listening: AtomicBool::new(false),
        })
    }

    /// Machine identity reported during the handshake.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Echo round trip measured during the handshake.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn state(&self) -> HandshakeState {
        if self.conn.is_closed() {
            HandshakeState::Faulted
        } else {
            HandshakeState::Established
        }
    }

    /// Returns whether the connection is still open.
    pub fn is_connected(&self) -> bool {
        !self.conn.is_closed()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection; a running dispatch loop ends with
    /// `ConnectionClosed`.
    pub async fn close(&self) {
        self.conn.close().await
    }

    // =========================================================================
    // Dispatch loop
    // =========================================================================

    /// Receives frames until an error occurs, passing every application
    /// message to `handler`. Protocol bookkeeping frames are skipped.
    ///
    /// Never returns `Ok`; the loop ends with the transport, codec or
    /// handler error that stopped it and the connection is closed.
    pub async fn listen<H: Handler>(&self, handler: &mut H) -> Result<(), ClientError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(ClientError::ReaderBusy);
        }

        let result = self.dispatch(handler).await;
        self.listening.store(false, Ordering::SeqCst);

        if let Err(ref e) = result {
            tracing::debug!("Dispatch loop ended: {}", e);
            self.conn.close().await;
        }
        result
    }

    async fn dispatch<H: Handler>(&self, handler: &mut H) -> Result<(), ClientError> {
        let policy = self.conn.config().handler_policy;

        loop {
            let (message_type, payload) = self.conn.receive().await?;

            if !message_type.is_application() {
                tracing::debug!("Ignoring {} frame", message_type);
                continue;
            }

            let message = Message::decode(message_type, &payload).map_err(ReceiveError::from)?;

            if let Err(e) = handler.on_message(message_type, message) {
                match policy {
                    HandlerPolicy::Stop => return Err(ClientError::Handler(e)),
                    HandlerPolicy::Skip => {
                        tracing::warn!("Handler failed on {} message: {}", message_type, e);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Probing
    // =========================================================================

    /// Sends an echo and measures the round trip.
    ///
    /// Reads the reply itself, so it fails with `ReaderBusy` while
    /// [`Client::listen`] runs.
    pub async fn ping(&self) -> Result<Duration, ClientError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(ClientError::ReaderBusy);
        }
        let result = handshake::probe(&self.conn, Echo::random()).await;
        self.listening.store(false, Ordering::SeqCst);

        if result.is_err() {
            self.conn.close().await;
        }
        Ok(result?)
    }

    // =========================================================================
    // Outbound commands
    // =========================================================================

    /// Asks the control unit to emit a message of the given type. The
    /// reply arrives through the dispatch loop.
    pub async fn request(&self, message_type: MessageType) -> Result<(), SendError> {
        let request = Request::new(message_type);
        self.conn.send(MessageType::Request, request.encode()).await
    }

    /// Sends a control command.
    pub async fn send_control(&self, control: Control) -> Result<(), SendError> {
        tracing::debug!("Sending control {:?}", control);
        self.conn.send(MessageType::Control, control.encode()).await
    }

    pub async fn horn(&self, on: bool) -> Result<(), SendError> {
        self.send_control(Control::MachineHorn(on)).await
    }

    pub async fn lights(&self, on: bool) -> Result<(), SendError> {
        self.send_control(Control::MachineLights(on)).await
    }

    pub async fn illumination(&self, on: bool) -> Result<(), SendError> {
        self.send_control(Control::MachineIllumination(on)).await
    }

    pub async fn hydraulic_lock(&self, on: bool) -> Result<(), SendError> {
        self.send_control(Control::HydraulicLock(on)).await
    }

    pub async fn hydraulic_quick_disconnect(&self, on: bool) -> Result<(), SendError> {
        self.send_control(Control::HydraulicQuickDisconnect(on)).await
    }

    /// Requests an engine speed in RPM.
    pub async fn engine_request(&self, rpm: u16) -> Result<(), SendError> {
        self.send_control(Control::EngineRequest(rpm)).await
    }

    pub async fn engine_shutdown(&self) -> Result<(), SendError> {
        self.send_control(Control::EngineShutdown).await
    }

    pub async fn machine_shutdown(&self) -> Result<(), SendError> {
        self.send_control(Control::MachineShutdown).await
    }
}
