//! Telemetry logging service.

use bytes::Bytes;
use glonax_client::{HandlerError, Service};
use glonax_protocol::{Control, Engine, Gnss, MessageType, ModuleStatus, Vms};
use serde::Serialize;

/// Logs every application message as a JSON line.
#[derive(Debug, Default)]
pub struct TelemetryLogger {
    received: u64,
}

impl TelemetryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages logged so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    fn log<T: Serialize>(&mut self, kind: MessageType, value: &T) -> Result<(), HandlerError> {
        let json = serde_json::to_string(value)?;
        self.received += 1;
        tracing::info!(kind = %kind, "{}", json);
        Ok(())
    }
}

impl Service for TelemetryLogger {
    fn on_status(&mut self, status: ModuleStatus) -> Result<(), HandlerError> {
        self.log(MessageType::Status, &status)
    }

    fn on_vms(&mut self, vms: Vms) -> Result<(), HandlerError> {
        self.log(MessageType::Vms, &vms)
    }

    fn on_gnss(&mut self, gnss: Gnss) -> Result<(), HandlerError> {
        self.log(MessageType::Gnss, &gnss)
    }

    fn on_engine(&mut self, engine: Engine) -> Result<(), HandlerError> {
        self.log(MessageType::Engine, &engine)
    }

    fn on_control(&mut self, control: Control) -> Result<(), HandlerError> {
        self.log(MessageType::Control, &control)
    }

    fn on_other(&mut self, message_type: MessageType, payload: Bytes) -> Result<(), HandlerError> {
        self.received += 1;
        tracing::debug!(kind = %message_type, "{} bytes", payload.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glonax_client::{Handler, ServiceHandler};
    use glonax_protocol::Message;

    #[test]
    fn test_counts_every_kind() {
        let mut handler = ServiceHandler(TelemetryLogger::new());
        handler
            .on_message(
                MessageType::Engine,
                Message::Engine(Engine {
                    driver_demand: 10,
                    actual_engine: 9,
                    rpm: 900,
                }),
            )
            .unwrap();
        handler
            .on_message(MessageType::Control, Message::Control(Control::EngineShutdown))
            .unwrap();
        handler
            .on_message(MessageType::Motion, Message::Opaque(Bytes::from_static(b"\x01")))
            .unwrap();

        assert_eq!(handler.into_inner().received(), 3);
    }
}
