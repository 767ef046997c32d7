//! Run a [`Connection`] over a script and collect what it published.

use std::sync::Arc;

use framelink::{Connection, ConnectionConfig, LoopExit, RawMessage};
use tokio::sync::mpsc;

use crate::scripted::{ReadStep, ScriptLog, ScriptedTransport};

/// Everything observed while driving a scripted connection to completion.
#[derive(Debug)]
pub struct DriveReport {
    /// Messages received on the delivery channel, in order.
    pub messages: Vec<RawMessage>,
    /// Why the read loop stopped.
    pub exit: Option<LoopExit>,
    /// What the transport observed.
    pub log: ScriptLog,
}

impl DriveReport {
    /// Payloads of every delivered message as owned vectors.
    #[must_use]
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.messages.iter().map(|m| m.payload().to_vec()).collect()
    }
}

/// Drive a connection with `read_buffer_size` and `read_failure_limit` over
/// `steps` until its read loop exits.
///
/// The script should end the stream (or trip the failure ceiling); a script
/// ending in [`ReadStep::Hang`] never completes.
///
/// # Panics
///
/// Panics if `read_buffer_size` is zero.
pub async fn drive_script(
    steps: Vec<ReadStep>,
    read_buffer_size: usize,
    read_failure_limit: usize,
) -> DriveReport {
    let config = ConnectionConfig::new(read_buffer_size, read_failure_limit)
        .expect("read buffer size must be non-zero");
    drive_transport(ScriptedTransport::new(steps), config).await
}

/// Drive a connection over an already configured [`ScriptedTransport`].
pub async fn drive_transport(transport: ScriptedTransport, config: ConnectionConfig) -> DriveReport {
    let log = transport.log();
    let mut conn = Connection::new(transport, Some(Arc::new(config)));
    let (tx, mut rx) = mpsc::channel(16);
    conn.set_delivery_channel(tx);
    conn.start();

    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    let exit = conn.wait().await;

    DriveReport {
        messages,
        exit,
        log,
    }
}
