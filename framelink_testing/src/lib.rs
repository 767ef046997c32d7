//! Test utilities for `framelink`.
//!
//! [`ScriptedTransport`] replays a fixed sequence of read outcomes so tests
//! can drive a [`Connection`](framelink::Connection) through transient
//! failures, split messages, and end-of-stream edge cases without a socket.
//!
//! ```rust
//! use framelink_testing::{ReadStep, drive_script, frame};
//!
//! # async fn example() {
//! let report = drive_script(vec![ReadStep::data(frame(b"hi"))], 16, 3).await;
//! assert_eq!(report.payloads(), vec![b"hi".to_vec()]);
//! # }
//! ```

pub mod drive;
pub mod frames;
pub mod logging;
pub mod scripted;

pub use drive::{DriveReport, drive_script, drive_transport};
pub use frames::{frame, frames, split_at};
pub use logging::{LoggerHandle, logger};
pub use scripted::{ReadStep, ScriptLog, ScriptedTransport};
