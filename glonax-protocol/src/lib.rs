//! # glonax-protocol
//!
//! Wire protocol implementation for Glonax machine control units.
//!
//! This crate provides:
//! - The fixed 10-byte frame header and its validation
//! - Binary payload codecs for every message kind
//! - Bounded payload readers that never read past a payload
//! - Frame and codec error types

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{PayloadReader, PayloadWriter};
pub use error::{CodecError, FrameError};
pub use frame::{
    decode_header, encode_header, Frame, Header, MessageType, FRAME_HEADER_SIZE, MAGIC,
};
pub use message::{
    Control, Echo, Engine, Gnss, Instance, MachineType, Message, ModuleStatus, Request, Session,
    Vms,
};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u8 = 0x03;

/// Default port of the Glonax control unit.
pub const DEFAULT_PORT: u16 = 30051;

/// Maximum frame payload size, bounded by the 16-bit length field.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;
