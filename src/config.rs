//! Connection configuration.
//!
//! [`ConnectionConfig`] holds the tunables consumed by the read loop. A single
//! process-wide default is built lazily and shared by every connection created
//! without an explicit configuration.

use std::sync::{Arc, LazyLock};

use thiserror::Error;

/// Errors raised while building a [`ConnectionConfig`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The half-buffer must hold at least one byte.
    #[error("read buffer size must be greater than zero")]
    ZeroReadBufferSize,
}

/// Immutable tunables for a connection's read loop.
///
/// # Default Values
/// - `read_buffer_size`: 4096 bytes
/// - `read_failure_limit`: 3 consecutive failures
///
/// # Invariants
/// - `read_buffer_size` is never zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    read_buffer_size: usize,
    read_failure_limit: usize,
}

static DEFAULT_CONFIG: LazyLock<Arc<ConnectionConfig>> =
    LazyLock::new(|| Arc::new(ConnectionConfig::DEFAULT));

/// Return the shared process-wide default configuration.
///
/// Every call returns a handle to the same allocation.
///
/// ```
/// use std::sync::Arc;
///
/// use framelink::config::default_config;
///
/// assert!(Arc::ptr_eq(&default_config(), &default_config()));
/// ```
#[must_use]
pub fn default_config() -> Arc<ConnectionConfig> { Arc::clone(&DEFAULT_CONFIG) }

impl ConnectionConfig {
    /// The library default.
    pub const DEFAULT: ConnectionConfig = ConnectionConfig {
        read_buffer_size: 4096,
        read_failure_limit: 3,
    };

    /// Build a configuration, rejecting a zero-sized read buffer.
    ///
    /// A `read_failure_limit` of zero is accepted and means the read loop
    /// gives up before issuing its first read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroReadBufferSize`] when `read_buffer_size` is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use framelink::config::{ConfigError, ConnectionConfig};
    ///
    /// let cfg = ConnectionConfig::new(8, 2).expect("valid config");
    /// assert_eq!(cfg.read_buffer_size(), 8);
    /// assert_eq!(
    ///     ConnectionConfig::new(0, 2),
    ///     Err(ConfigError::ZeroReadBufferSize)
    /// );
    /// ```
    pub const fn new(read_buffer_size: usize, read_failure_limit: usize) -> Result<Self, ConfigError> {
        if read_buffer_size == 0 {
            return Err(ConfigError::ZeroReadBufferSize);
        }
        Ok(Self {
            read_buffer_size,
            read_failure_limit,
        })
    }

    /// Return a copy with a different half-buffer size, clamped to at least 1.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = if size == 0 { 1 } else { size };
        self
    }

    /// Return a copy with a different consecutive-failure ceiling.
    #[must_use]
    pub const fn with_read_failure_limit(mut self, limit: usize) -> Self {
        self.read_failure_limit = limit;
        self
    }

    /// Capacity of one half of the read buffer in bytes.
    #[must_use]
    pub const fn read_buffer_size(&self) -> usize { self.read_buffer_size }

    /// Consecutive transient read failures tolerated before the loop stops.
    #[must_use]
    pub const fn read_failure_limit(&self) -> usize { self.read_failure_limit }
}

impl Default for ConnectionConfig {
    fn default() -> Self { Self::DEFAULT }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;

    #[test]
    fn default_matches_constant() {
        assert_eq!(ConnectionConfig::default(), ConnectionConfig::DEFAULT);
        assert_eq!(*default_config(), ConnectionConfig::DEFAULT);
    }

    #[test]
    fn shared_default_is_a_single_instance() {
        let a = default_config();
        let b = default_config();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(512, 512)]
    fn builder_clamps_buffer_size(#[case] requested: usize, #[case] expected: usize) {
        let cfg = ConnectionConfig::DEFAULT.with_read_buffer_size(requested);
        assert_eq!(cfg.read_buffer_size(), expected);
    }

    #[test]
    fn zero_failure_limit_is_accepted() {
        let cfg = ConnectionConfig::new(16, 0).expect("zero limit is valid");
        assert_eq!(cfg.read_failure_limit(), 0);
    }

    #[test]
    fn zero_buffer_is_rejected() {
        assert_eq!(
            ConnectionConfig::new(0, 3),
            Err(ConfigError::ZeroReadBufferSize)
        );
    }
}
