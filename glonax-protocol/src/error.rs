//! Protocol error types.

use crate::frame::MessageType;
use thiserror::Error;

/// Errors raised while validating a frame header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("invalid magic bytes: expected 'LXR', got {0:?}")]
    BadMagic([u8; 3]),

    #[error("unsupported protocol version: {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("non-zero header padding: {0:?}")]
    BadPadding([u8; 3]),

    #[error("unknown message type: {0:#04x}")]
    UnknownType(u8),
}

/// Errors raised while encoding or decoding a message payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("truncated payload: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("field too large: {len} bytes (max {max})")]
    FieldTooLarge { len: usize, max: usize },

    #[error("invalid value {value:#04x} for {field}")]
    InvalidEnumValue { field: &'static str, value: u8 },

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("{0} is not an application message")]
    NotApplication(MessageType),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::BadMagic(*b"XYZ");
        assert!(err.to_string().contains("magic"));

        let err = FrameError::UnsupportedVersion(0x02);
        assert!(err.to_string().contains("0x02"));

        let err = FrameError::UnknownType(0xEE);
        assert!(err.to_string().contains("0xee"));
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::Truncated {
            needed: 4,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('4') && msg.contains('2'));

        let err = CodecError::FieldTooLarge {
            len: 70000,
            max: 65535,
        };
        assert!(err.to_string().contains("70000"));

        let err = CodecError::InvalidEnumValue {
            field: "machine type",
            value: 0x09,
        };
        assert!(err.to_string().contains("machine type"));

        let err = CodecError::OutOfRange {
            field: "rpm",
            value: 9000,
        };
        assert!(err.to_string().contains("9000"));

        let err = CodecError::NotApplication(MessageType::Session);
        assert!(err.to_string().contains("SESSION"));
    }
}
