#![doc(html_root_url = "https://docs.rs/framelink/latest")]
//! Public API for the `framelink` library.
//!
//! This crate turns a single bidirectional byte stream into a sequence of
//! decoded messages. A [`Connection`] owns the transport and runs one detached
//! read loop. The loop feeds an incremental
//! [`MessageDecoder`](decoder::MessageDecoder) from a double buffer and
//! publishes completed messages to a bounded channel. A configurable number of
//! consecutive transient read failures is tolerated before it gives up.

pub mod buffer;
pub mod byte_order;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod metrics;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod transport;

pub use config::{ConfigError, ConnectionConfig, default_config};
pub use connection::{Connection, LoopExit, running_connection_count};
pub use decoder::{DecodeError, DecodeFailure, MessageDecoder, RawMessage, RawMessageParser};
pub use transport::{ReadOutcome, StreamTransport, Transport, TransportReader, TransportWriter};
