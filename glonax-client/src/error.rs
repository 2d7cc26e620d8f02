//! Client error types.

use crate::handler::HandlerError;
use glonax_protocol::{CodecError, FrameError, MessageType};
use thiserror::Error;

/// Errors raised while reading a frame.
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("read timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors raised while writing a frame.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors raised by the connection handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("echo mismatch: sent {sent:02x?}, received {received:02x?}")]
    EchoMismatch { sent: [u8; 4], received: [u8; 4] },

    #[error("unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        expected: MessageType,
        actual: MessageType,
    },

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect timeout")]
    Timeout,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("send failed: {0}")]
    Send(#[from] SendError),

    #[error("receive failed: {0}")]
    Receive(#[from] ReceiveError),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("handler error: {0}")]
    Handler(#[source] HandlerError),

    #[error("read path is owned by the dispatch loop")]
    ReaderBusy,
}

impl ClientError {
    /// Returns whether reconnecting and redoing the handshake may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::Send(SendError::ConnectionClosed | SendError::Io(_)) => true,
            ClientError::Receive(_) => true,
            ClientError::Handshake(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_mismatch_display() {
        let err = HandshakeError::EchoMismatch {
            sent: [0xAA, 0xBB, 0xCC, 0xDD],
            received: [0xAA, 0xBB, 0xCC, 0x00],
        };
        let msg = err.to_string();
        assert!(msg.contains("dd"));
        assert!(msg.contains("00"));
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Receive(ReceiveError::ConnectionClosed).is_retryable());
        assert!(ClientError::Handshake(HandshakeError::UnexpectedMessage {
            expected: MessageType::Instance,
            actual: MessageType::Error,
        })
        .is_retryable());

        assert!(!ClientError::ReaderBusy.is_retryable());
        assert!(!ClientError::InvalidAddress("nowhere".to_string()).is_retryable());
        assert!(!ClientError::Send(SendError::Codec(CodecError::FieldTooLarge {
            len: 70000,
            max: 65535
        }))
        .is_retryable());
        assert!(!ClientError::Handler("boom".into()).is_retryable());
    }

    #[test]
    fn test_frame_error_conversion() {
        let err: ReceiveError = FrameError::UnknownType(0x99).into();
        assert!(matches!(err, ReceiveError::Frame(FrameError::UnknownType(0x99))));
    }
}
