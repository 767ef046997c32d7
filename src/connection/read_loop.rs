//! The inbound read loop.
//!
//! The loop reads into a [`DoubleBuffer`], feeds every byte it reads to the
//! decoder, and forwards completed messages to the delivery channel with a
//! blocking send. Consecutive transient read failures are counted; once the
//! count reaches the configured ceiling the loop stops reading.

use std::{fmt, sync::Arc};

use log::warn;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    buffer::DoubleBuffer,
    config::ConnectionConfig,
    decoder::MessageDecoder,
    metrics::{self, MessageOutcome},
    transport::{ReadOutcome, TransportReader},
};

/// Why a read loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// Too many consecutive transient read failures.
    FailureLimit {
        /// Consecutive failures observed when the loop gave up.
        failures: usize,
    },
    /// The peer closed the stream.
    EndOfStream,
    /// The connection was closed locally.
    Closed,
    /// The loop task panicked.
    Panicked,
}

impl LoopExit {
    /// Short label for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailureLimit { .. } => "failure_limit",
            Self::EndOfStream => "end_of_stream",
            Self::Closed => "closed",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailureLimit { failures } => {
                write!(f, "gave up after {failures} consecutive read failures")
            }
            Self::EndOfStream => f.write_str("peer closed the stream"),
            Self::Closed => f.write_str("connection closed locally"),
            Self::Panicked => f.write_str("read loop panicked"),
        }
    }
}

/// State owned by one running read loop.
pub(crate) struct ReadLoop<R, D: MessageDecoder> {
    reader: R,
    decoder: D,
    buffer: DoubleBuffer,
    config: Arc<ConnectionConfig>,
    delivery: Option<mpsc::Sender<D::Message>>,
    shutdown: CancellationToken,
    peer: Arc<str>,
}

impl<R, D> ReadLoop<R, D>
where
    R: TransportReader,
    D: MessageDecoder,
{
    pub(crate) fn new(
        reader: R,
        decoder: D,
        config: Arc<ConnectionConfig>,
        delivery: Option<mpsc::Sender<D::Message>>,
        shutdown: CancellationToken,
        peer: Arc<str>,
    ) -> Self {
        Self {
            buffer: DoubleBuffer::new(config.read_buffer_size()),
            reader,
            decoder,
            config,
            delivery,
            shutdown,
            peer,
        }
    }

    /// Drive the loop until it terminates.
    pub(crate) async fn run(mut self) -> LoopExit {
        let limit = self.config.read_failure_limit();
        let mut failures = 0usize;

        loop {
            if failures >= limit {
                return LoopExit::FailureLimit { failures };
            }
            if self.shutdown.is_cancelled() {
                return LoopExit::Closed;
            }

            let window = self.buffer.read_window();
            let window_len = window.len();
            let outcome = tokio::select! {
                biased;

                () = self.shutdown.cancelled() => return LoopExit::Closed,
                outcome = self.reader.read(window) => outcome,
            };

            let avail = match outcome {
                ReadOutcome::Failed { read, error } => {
                    failures += 1;
                    metrics::inc_read_failures();
                    warn!(
                        "reading failed: peer_addr={}, error={error}, discarded_bytes={read}, \
                         failures={failures}",
                        self.peer
                    );
                    continue;
                }
                ReadOutcome::Eof(0) => return LoopExit::EndOfStream,
                ReadOutcome::Eof(n) | ReadOutcome::Data(n) => n.min(window_len),
            };

            failures = 0;
            self.dispatch(avail).await;
            self.buffer.recycle();
        }
    }

    /// Hand `avail` freshly read bytes to the decoder, forwarding every
    /// message it completes.
    async fn dispatch(&mut self, mut avail: usize) {
        while avail > 0 {
            let consumed = match self.decoder.consume(self.buffer.pending(avail)) {
                Ok(n) => n,
                Err(failure) => {
                    metrics::inc_decode_errors();
                    warn!(
                        "parsing bytes failed: peer_addr={}, error={}",
                        self.peer, failure.error
                    );
                    failure.consumed
                }
            }
            .min(avail);
            avail -= consumed;
            self.buffer.advance(consumed);

            let message = self.decoder.fetch_message();
            let progressed = consumed > 0 || message.is_some();
            if let Some(message) = message {
                deliver(self.delivery.as_ref(), &self.peer, message).await;
            }

            if !progressed {
                warn!(
                    "decoder made no progress: peer_addr={}, discarded_bytes={avail}",
                    self.peer
                );
                return;
            }
        }
    }
}

/// Publish `message`, blocking until the channel accepts it.
///
/// Without a channel, or once the receiver is gone, the message is dropped
/// and a warning is logged.
async fn deliver<M>(delivery: Option<&mpsc::Sender<M>>, peer: &str, message: M) {
    let Some(tx) = delivery else {
        metrics::inc_messages(MessageOutcome::Discarded);
        warn!("connection discarded message: peer_addr={peer}, reason=no_channel");
        return;
    };
    if tx.send(message).await.is_ok() {
        metrics::inc_messages(MessageOutcome::Delivered);
    } else {
        metrics::inc_messages(MessageOutcome::Discarded);
        warn!("connection discarded message: peer_addr={peer}, reason=channel_closed");
    }
}

#[cfg(test)]
#[path = "read_loop_tests.rs"]
mod tests;
