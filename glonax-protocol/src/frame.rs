//! Binary frame format for the Glonax protocol.
//!
//! Frame layout (10 bytes header + payload):
//!
//! ```text
//! +--------+---------+--------------+-------------+----------+
//! | magic  | version | message_type | payload_len | reserved |
//! | 3 bytes| 1 byte  |    1 byte    |   2 bytes   | 3 bytes  |
//! +--------+---------+--------------+-------------+----------+
//! | payload                                                  |
//! | payload_len bytes                                        |
//! +----------------------------------------------------------+
//! ```
//!
//! All multi-byte header fields are big-endian. The reserved bytes must be
//! zero.

use crate::error::{CodecError, FrameError};
use crate::{MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic bytes identifying Glonax frames: "LXR"
pub const MAGIC: [u8; 3] = *b"LXR";

/// Size of the fixed frame header in bytes (3+1+1+2+3 = 10).
pub const FRAME_HEADER_SIZE: usize = 10;

/// Frame discriminant, also used as the dispatch key for decoded messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Protocol bookkeeping
    Error,
    Echo,
    Session,
    Shutdown,
    Request,
    Instance,

    // Application telemetry and control
    Status,
    Motion,
    Signal,
    Actor,
    Vms,
    Gnss,
    Engine,
    Target,
    Control,
    Rotator,
}

impl MessageType {
    /// Returns the wire value of this type.
    pub fn as_u8(&self) -> u8 {
        match self {
            MessageType::Error => 0x00,
            MessageType::Echo => 0x01,
            MessageType::Session => 0x10,
            MessageType::Shutdown => 0x11,
            MessageType::Request => 0x12,
            MessageType::Instance => 0x15,
            MessageType::Status => 0x16,
            MessageType::Motion => 0x20,
            MessageType::Signal => 0x31,
            MessageType::Actor => 0x40,
            MessageType::Vms => 0x41,
            MessageType::Gnss => 0x42,
            MessageType::Engine => 0x43,
            MessageType::Target => 0x44,
            MessageType::Control => 0x45,
            MessageType::Rotator => 0x46,
        }
    }

    /// Maps a wire value back to a type, `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        let ty = match value {
            0x00 => MessageType::Error,
            0x01 => MessageType::Echo,
            0x10 => MessageType::Session,
            0x11 => MessageType::Shutdown,
            0x12 => MessageType::Request,
            0x15 => MessageType::Instance,
            0x16 => MessageType::Status,
            0x20 => MessageType::Motion,
            0x31 => MessageType::Signal,
            0x40 => MessageType::Actor,
            0x41 => MessageType::Vms,
            0x42 => MessageType::Gnss,
            0x43 => MessageType::Engine,
            0x44 => MessageType::Target,
            0x45 => MessageType::Control,
            0x46 => MessageType::Rotator,
            _ => return None,
        };
        Some(ty)
    }

    /// Returns whether frames of this type are forwarded to application
    /// handlers during dispatch.
    pub fn is_application(&self) -> bool {
        matches!(
            self,
            MessageType::Status
                | MessageType::Motion
                | MessageType::Vms
                | MessageType::Gnss
                | MessageType::Engine
                | MessageType::Target
                | MessageType::Control
                | MessageType::Rotator
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Error => "ERROR",
            MessageType::Echo => "ECHO",
            MessageType::Session => "SESSION",
            MessageType::Shutdown => "SHUTDOWN",
            MessageType::Request => "REQUEST",
            MessageType::Instance => "INSTANCE",
            MessageType::Status => "STATUS",
            MessageType::Motion => "MOTION",
            MessageType::Signal => "SIGNAL",
            MessageType::Actor => "ACTOR",
            MessageType::Vms => "VMS",
            MessageType::Gnss => "GNSS",
            MessageType::Engine => "ENGINE",
            MessageType::Target => "TARGET",
            MessageType::Control => "CONTROL",
            MessageType::Rotator => "ROTATOR",
        };
        f.write_str(name)
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version.
    pub version: u8,
    /// Type of the payload that follows.
    pub message_type: MessageType,
    /// Exact payload length in bytes.
    pub payload_len: u16,
}

impl Header {
    pub fn new(version: u8, message_type: MessageType, payload_len: u16) -> Self {
        Self {
            version,
            message_type,
            payload_len,
        }
    }

    /// Encodes the header into its 10-byte wire form.
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..3].copy_from_slice(&MAGIC);
        buf[3] = self.version;
        buf[4] = self.message_type.as_u8();
        buf[5..7].copy_from_slice(&self.payload_len.to_be_bytes());
        // Reserved bytes 7..10 stay zero
        buf
    }

    /// Decodes and validates a header, accepting only `expected_version`.
    pub fn decode(
        buf: &[u8; FRAME_HEADER_SIZE],
        expected_version: u8,
    ) -> Result<Self, FrameError> {
        let magic = [buf[0], buf[1], buf[2]];
        if magic != MAGIC {
            return Err(FrameError::BadMagic(magic));
        }

        let version = buf[3];
        if version != expected_version {
            return Err(FrameError::UnsupportedVersion(version));
        }

        let message_type =
            MessageType::from_u8(buf[4]).ok_or(FrameError::UnknownType(buf[4]))?;

        let payload_len = u16::from_be_bytes([buf[5], buf[6]]);

        let reserved = [buf[7], buf[8], buf[9]];
        if reserved != [0; 3] {
            return Err(FrameError::BadPadding(reserved));
        }

        Ok(Self {
            version,
            message_type,
            payload_len,
        })
    }
}

/// Encodes a header for the default protocol version.
pub fn encode_header(message_type: MessageType, payload_len: u16) -> [u8; FRAME_HEADER_SIZE] {
    Header::new(PROTOCOL_VERSION, message_type, payload_len).encode()
}

/// Decodes a header for the default protocol version.
pub fn decode_header(
    buf: &[u8; FRAME_HEADER_SIZE],
) -> Result<(MessageType, u16), FrameError> {
    let header = Header::decode(buf, PROTOCOL_VERSION)?;
    Ok((header.message_type, header.payload_len))
}

/// A complete frame ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(message_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    /// Encodes header and payload into one contiguous buffer.
    pub fn encode(&self, version: u8) -> Result<BytesMut, CodecError> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD_SIZE {
            return Err(CodecError::FieldTooLarge {
                len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = Header::new(version, self.message_type, len as u16);
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + len);
        buf.put_slice(&header.encode());
        buf.put_slice(&self.payload);
        Ok(buf)
    }
}
