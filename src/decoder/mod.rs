//! Incremental message decoding.
//!
//! The read loop never interprets bytes itself. It hands each freshly read
//! range to a [`MessageDecoder`], which consumes a prefix of it and may then
//! report one completed message. Partial frames stay inside the decoder
//! between calls, so a message may be split across any number of reads.
//!
//! # Error Handling
//!
//! Decode failures are reported through [`DecodeFailure`], which still carries
//! the number of bytes consumed. The loop logs the failure and carries on; a
//! decode error never affects connection liveness.

use bytes::Bytes;

pub mod error;
mod raw;

pub use error::{DecodeError, DecodeFailure};
pub use raw::{LENGTH_HEADER_SIZE, MAX_MESSAGE_LENGTH, MIN_MESSAGE_LENGTH, RawMessageParser};

/// A fully decoded application message.
///
/// The payload is opaque to the connection; it is handed to the delivery
/// channel untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMessage {
    payload: Bytes,
}

impl RawMessage {
    /// Wrap a payload.
    #[must_use]
    pub fn new(payload: Bytes) -> Self { Self { payload } }

    /// Borrow the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.payload.len() }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.payload.is_empty() }
}

impl From<Bytes> for RawMessage {
    fn from(payload: Bytes) -> Self { Self::new(payload) }
}

impl From<&'static [u8]> for RawMessage {
    fn from(payload: &'static [u8]) -> Self { Self::new(Bytes::from_static(payload)) }
}

/// Stateful decoder turning byte ranges into messages.
///
/// # Contract
///
/// - [`consume`](Self::consume) must never report more bytes than it was
///   offered. It may report fewer, but any byte it reports as consumed must be
///   retained internally if it belongs to an unfinished message: the caller
///   reuses its buffer afterwards.
/// - A failed call reports how many bytes it consumed and keeps any carry-over
///   state it still considers valid.
/// - [`fetch_message`](Self::fetch_message) returns and clears one completed
///   message. Repeated calls without an intervening `consume` return `None`.
pub trait MessageDecoder: Send + 'static {
    /// Message type produced by this decoder.
    type Message: Send + 'static;

    /// Consume a prefix of `src`, returning the number of bytes taken.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeFailure`] describing the problem together with the
    /// bytes consumed before (and including) the offending input.
    fn consume(&mut self, src: &[u8]) -> Result<usize, DecodeFailure>;

    /// Take the most recently completed message, if any.
    fn fetch_message(&mut self) -> Option<Self::Message>;
}
