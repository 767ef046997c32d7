//! Metric helpers for `framelink`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature the
//! helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking connections with a running read loop.
pub const CONNECTIONS_ACTIVE: &str = "framelink_connections_active";
/// Name of the counter tracking decoded messages.
pub const MESSAGES_TOTAL: &str = "framelink_messages_total";
/// Name of the counter tracking transient read failures.
pub const READ_FAILURES_TOTAL: &str = "framelink_read_failures_total";
/// Name of the counter tracking decode errors.
pub const DECODE_ERRORS_TOTAL: &str = "framelink_decode_errors_total";
/// Name of the counter tracking read-loop exits by reason.
pub const LOOP_EXITS_TOTAL: &str = "framelink_loop_exits_total";

/// What happened to a decoded message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Accepted by the delivery channel.
    Delivered,
    /// Dropped because no channel could accept it.
    Discarded,
}

impl MessageOutcome {
    /// Label value used for the `outcome` label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageOutcome::Delivered => "delivered",
            MessageOutcome::Discarded => "discarded",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a decoded message and its fate.
pub fn inc_messages(outcome: MessageOutcome) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record a transient read failure.
pub fn inc_read_failures() {
    #[cfg(feature = "metrics")]
    counter!(READ_FAILURES_TOTAL).increment(1);
}

/// Record a decode error.
pub fn inc_decode_errors() {
    #[cfg(feature = "metrics")]
    counter!(DECODE_ERRORS_TOTAL).increment(1);
}

/// Record a read loop stopping for `reason`.
pub fn inc_loop_exits(reason: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(LOOP_EXITS_TOTAL, "reason" => reason).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = reason;
}
