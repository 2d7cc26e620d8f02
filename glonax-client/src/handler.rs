//! Application message handlers.

use bytes::Bytes;
use glonax_protocol::{Control, Engine, Gnss, Message, MessageType, ModuleStatus, Vms};
use serde::{Deserialize, Serialize};

/// Error returned by application handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What the dispatch loop does when a handler returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerPolicy {
    /// End the loop and return the handler error.
    #[default]
    Stop,
    /// Log the error and keep dispatching.
    Skip,
}

/// Receives every decoded application message.
pub trait Handler {
    fn on_message(&mut self, message_type: MessageType, message: Message)
        -> Result<(), HandlerError>;
}

/// Handler backed by a closure, see [`from_fn`].
pub struct FnHandler<F>(F);

/// Wraps a closure as a [`Handler`].
pub fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(MessageType, Message) -> Result<(), HandlerError>,
{
    FnHandler(f)
}

impl<F> Handler for FnHandler<F>
where
    F: FnMut(MessageType, Message) -> Result<(), HandlerError>,
{
    fn on_message(
        &mut self,
        message_type: MessageType,
        message: Message,
    ) -> Result<(), HandlerError> {
        (self.0)(message_type, message)
    }
}

/// Per-kind callbacks. Every method defaults to ignoring the message.
pub trait Service {
    fn on_status(&mut self, _status: ModuleStatus) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_vms(&mut self, _vms: Vms) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_gnss(&mut self, _gnss: Gnss) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_engine(&mut self, _engine: Engine) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_control(&mut self, _control: Control) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Motion, target and rotator payloads.
    fn on_other(&mut self, _message_type: MessageType, _payload: Bytes) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Adapts a [`Service`] into a [`Handler`].
pub struct ServiceHandler<S>(pub S);

impl<S: Service> ServiceHandler<S> {
    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S: Service> Handler for ServiceHandler<S> {
    fn on_message(
        &mut self,
        message_type: MessageType,
        message: Message,
    ) -> Result<(), HandlerError> {
        match message {
            Message::Status(status) => self.0.on_status(status),
            Message::Vms(vms) => self.0.on_vms(vms),
            Message::Gnss(gnss) => self.0.on_gnss(gnss),
            Message::Engine(engine) => self.0.on_engine(engine),
            Message::Control(control) => self.0.on_control(control),
            Message::Opaque(payload) => self.0.on_other(message_type, payload),
        }
    }
}
