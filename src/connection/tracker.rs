//! Bookkeeping for read loops while they run.
//!
//! A [`LoopTracker`] lives exactly as long as its read-loop task. Creating one
//! counts the loop as running; dropping it records how the loop ended. A
//! tracker dropped before [`finish`](LoopTracker::finish) belongs to a task
//! that was aborted, for example by runtime shutdown.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use super::LoopExit;
use crate::metrics;

static RUNNING: AtomicU64 = AtomicU64::new(0);

/// Exit label for a loop that never reported an exit.
const ABORTED: &str = "aborted";

pub(super) struct LoopTracker {
    peer: Arc<str>,
    exit: Option<LoopExit>,
}

impl LoopTracker {
    pub(super) fn start(peer: Arc<str>) -> Self {
        RUNNING.fetch_add(1, Ordering::Relaxed);
        metrics::inc_connections();
        tracing::debug!(peer_addr = %peer, "read loop started");
        Self { peer, exit: None }
    }

    /// Record why the loop stopped and hand the reason back.
    pub(super) fn finish(&mut self, exit: LoopExit) -> LoopExit {
        self.exit = Some(exit);
        exit
    }

    fn reason(&self) -> &'static str { self.exit.map_or(ABORTED, LoopExit::as_str) }
}

impl Drop for LoopTracker {
    fn drop(&mut self) {
        RUNNING.fetch_sub(1, Ordering::Relaxed);
        metrics::dec_connections();
        let reason = self.reason();
        metrics::inc_loop_exits(reason);
        tracing::debug!(peer_addr = %self.peer, reason, "read loop exited");
    }
}

/// Return the number of connections whose read loop is currently running.
#[must_use]
pub fn running_connection_count() -> u64 { RUNNING.load(Ordering::Relaxed) }
