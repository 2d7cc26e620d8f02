//! # glonax-client
//!
//! Client library for Glonax machine control units.
//!
//! This crate provides:
//! - Async TCP and Unix socket transport with exact-length frame reads
//! - The echo, session and instance handshake
//! - A dispatch loop that hands application messages to a handler
//! - Control command senders usable while the dispatch loop runs

pub mod client;
pub mod connection;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig, DEFAULT_USER_AGENT};
pub use error::{ClientError, HandshakeError, ReceiveError, SendError};
pub use handler::{from_fn, Handler, HandlerError, HandlerPolicy, Service, ServiceHandler};
pub use handshake::{Handshake, HandshakeOutcome, HandshakeState};
pub use stream::{ClientStream, Endpoint};
