//! Length-prefixed decoder used by default.
//!
//! Each message is a 4-byte big-endian length followed by that many payload
//! bytes. Header and payload bytes are copied into the parser as they arrive,
//! so nothing is ever read back from the caller's buffer after `consume`
//! returns.

use bytes::BytesMut;

use super::{DecodeError, DecodeFailure, MessageDecoder, RawMessage};
use crate::byte_order::read_network_u32;

/// Length prefix header size (4 bytes for big-endian u32).
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Minimum accepted value for the maximum message length.
pub const MIN_MESSAGE_LENGTH: usize = 64;

/// Maximum message length in bytes (16 MiB).
pub const MAX_MESSAGE_LENGTH: usize = 16 * 1024 * 1024;

fn clamp_message_length(value: usize) -> usize { value.clamp(MIN_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH) }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Header,
    Payload { expected: usize },
    Skip { remaining: usize },
}

/// Incremental parser for length-prefixed raw messages.
///
/// One call to [`consume`](MessageDecoder::consume) completes at most one
/// message: the parser stops at the end of a message and leaves the rest of
/// the input for the next call. Oversized messages are reported once and their
/// payload is skipped.
///
/// ```
/// use bytes::Bytes;
/// use framelink::decoder::{MessageDecoder, RawMessageParser};
///
/// let mut parser = RawMessageParser::new();
/// assert_eq!(parser.consume(&[0, 0, 0, 2, b'h']), Ok(5));
/// assert!(parser.fetch_message().is_none());
/// assert_eq!(parser.consume(b"i"), Ok(1));
/// assert_eq!(parser.fetch_message().map(|m| m.into_payload()), Some(Bytes::from_static(b"hi")));
/// ```
#[derive(Debug)]
pub struct RawMessageParser {
    max_message_length: usize,
    header: [u8; LENGTH_HEADER_SIZE],
    header_len: usize,
    payload: BytesMut,
    state: State,
    ready: Option<RawMessage>,
}

impl RawMessageParser {
    /// Create a parser accepting messages up to [`MAX_MESSAGE_LENGTH`].
    #[must_use]
    pub fn new() -> Self { Self::with_max_message_length(MAX_MESSAGE_LENGTH) }

    /// Create a parser with a custom maximum message length.
    ///
    /// The value is clamped to `[MIN_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH]`.
    #[must_use]
    pub fn with_max_message_length(max: usize) -> Self {
        Self {
            max_message_length: clamp_message_length(max),
            header: [0; LENGTH_HEADER_SIZE],
            header_len: 0,
            payload: BytesMut::new(),
            state: State::Header,
            ready: None,
        }
    }

    /// Maximum payload length this parser accepts.
    #[must_use]
    pub fn max_message_length(&self) -> usize { self.max_message_length }

    /// Bytes of an unfinished message currently held by the parser.
    ///
    /// The length prefix counts once it has been parsed. Bytes of a skipped
    /// oversized payload are never held.
    #[must_use]
    pub fn buffered(&self) -> usize {
        match self.state {
            State::Header => self.header_len,
            State::Payload { .. } => LENGTH_HEADER_SIZE + self.payload.len(),
            State::Skip { .. } => 0,
        }
    }

    /// Finish the header once all four bytes are present.
    ///
    /// Returns `Ok(true)` when the header completed a zero-length message.
    fn finish_header(&mut self) -> Result<bool, DecodeError> {
        self.header_len = 0;
        let size = read_network_u32(self.header) as usize;
        if size > self.max_message_length {
            self.state = State::Skip { remaining: size };
            return Err(DecodeError::OversizedMessage {
                size,
                max: self.max_message_length,
            });
        }
        if size == 0 {
            self.ready = Some(RawMessage::default());
            return Ok(true);
        }
        self.payload.reserve(size);
        self.state = State::Payload { expected: size };
        Ok(false)
    }
}

impl Default for RawMessageParser {
    fn default() -> Self { Self::new() }
}

impl MessageDecoder for RawMessageParser {
    type Message = RawMessage;

    fn consume(&mut self, src: &[u8]) -> Result<usize, DecodeFailure> {
        // An unfetched message blocks progress until the caller collects it.
        if self.ready.is_some() {
            return Ok(0);
        }

        let mut consumed = 0;
        while consumed < src.len() {
            let rest = &src[consumed..];
            match self.state {
                State::Header => {
                    let take = (LENGTH_HEADER_SIZE - self.header_len).min(rest.len());
                    self.header[self.header_len..self.header_len + take]
                        .copy_from_slice(&rest[..take]);
                    self.header_len += take;
                    consumed += take;
                    if self.header_len == LENGTH_HEADER_SIZE {
                        match self.finish_header() {
                            Ok(true) => return Ok(consumed),
                            Ok(false) => {}
                            Err(error) => return Err(DecodeFailure::new(consumed, error)),
                        }
                    }
                }
                State::Payload { expected } => {
                    let take = (expected - self.payload.len()).min(rest.len());
                    self.payload.extend_from_slice(&rest[..take]);
                    consumed += take;
                    if self.payload.len() == expected {
                        self.ready = Some(RawMessage::new(self.payload.split().freeze()));
                        self.state = State::Header;
                        return Ok(consumed);
                    }
                }
                State::Skip { remaining } => {
                    let take = remaining.min(rest.len());
                    consumed += take;
                    self.state = if remaining == take {
                        State::Header
                    } else {
                        State::Skip {
                            remaining: remaining - take,
                        }
                    };
                }
            }
        }
        Ok(consumed)
    }

    fn fetch_message(&mut self) -> Option<RawMessage> { self.ready.take() }
}
