//! Error types for the decoding layer.

use thiserror::Error;

/// Problems a decoder can report while consuming bytes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Length prefix announces a message larger than the configured maximum.
    ///
    /// The parser skips the announced payload and resumes at the next header.
    #[error("message exceeds max length: {size} > {max}")]
    OversizedMessage {
        /// Size announced by the length prefix.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },

    /// Input could not be interpreted by a custom decoder.
    #[error("malformed message: {reason}")]
    Malformed {
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl DecodeError {
    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::OversizedMessage { .. } => "oversized",
            Self::Malformed { .. } => "malformed",
        }
    }
}

/// A decode error paired with the number of bytes consumed when it occurred.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{error} (after consuming {consumed} bytes)")]
pub struct DecodeFailure {
    /// Bytes consumed by the failing call.
    pub consumed: usize,
    /// Underlying cause.
    #[source]
    pub error: DecodeError,
}

impl DecodeFailure {
    /// Pair `error` with the bytes consumed by the failing call.
    #[must_use]
    pub fn new(consumed: usize, error: DecodeError) -> Self { Self { consumed, error } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_includes_consumed_bytes() {
        let failure = DecodeFailure::new(
            4,
            DecodeError::OversizedMessage {
                size: 2000,
                max: 1024,
            },
        );
        assert_eq!(
            failure.to_string(),
            "message exceeds max length: 2000 > 1024 (after consuming 4 bytes)"
        );
        assert_eq!(failure.error.error_type(), "oversized");
    }

    #[test]
    fn malformed_reports_reason() {
        let err = DecodeError::Malformed {
            reason: "bad tag".into(),
        };
        assert_eq!(err.to_string(), "malformed message: bad tag");
        assert_eq!(err.error_type(), "malformed");
    }
}
