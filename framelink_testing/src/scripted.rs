//! A transport that replays scripted read outcomes.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use framelink::{ReadOutcome, Transport, TransportReader, TransportWriter};

/// One scripted response to a `read` call.
#[derive(Clone, Debug)]
pub enum ReadStep {
    /// Deliver these bytes as a successful read.
    Data(Vec<u8>),
    /// Deliver these bytes together with end-of-stream.
    Eof(Vec<u8>),
    /// Fail with `kind`, claiming to have read these bytes.
    Fail(Vec<u8>, io::ErrorKind),
    /// Never complete.
    Hang,
}

impl ReadStep {
    /// Successful read of `bytes`.
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self { Self::Data(bytes.into()) }

    /// End-of-stream carrying `bytes`.
    pub fn eof_with(bytes: impl Into<Vec<u8>>) -> Self { Self::Eof(bytes.into()) }

    /// Plain end-of-stream.
    #[must_use]
    pub fn eof() -> Self { Self::Eof(Vec::new()) }

    /// Transient failure with no bytes.
    #[must_use]
    pub fn fail() -> Self { Self::Fail(Vec::new(), io::ErrorKind::ConnectionReset) }
}

#[derive(Debug, Default)]
struct Recorded {
    windows: Vec<usize>,
    written: Vec<u8>,
    closes: usize,
}

/// Shared record of what a [`ScriptedTransport`] observed.
#[derive(Clone, Debug, Default)]
pub struct ScriptLog(Arc<Mutex<Recorded>>);

impl ScriptLog {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Length of the buffer passed to each `read` call, in order.
    #[must_use]
    pub fn read_windows(&self) -> Vec<usize> { self.lock().windows.clone() }

    /// Number of `read` calls issued.
    #[must_use]
    pub fn reads(&self) -> usize { self.lock().windows.len() }

    /// All bytes accepted by `write`.
    #[must_use]
    pub fn written(&self) -> Vec<u8> { self.lock().written.clone() }

    /// Number of `close` calls.
    #[must_use]
    pub fn closes(&self) -> usize { self.lock().closes }
}

/// In-memory [`Transport`] driven by a list of [`ReadStep`]s.
///
/// Once the script is exhausted every further read reports end-of-stream.
#[derive(Debug)]
pub struct ScriptedTransport {
    steps: VecDeque<ReadStep>,
    log: ScriptLog,
    close_error: Option<io::ErrorKind>,
    remote_addr: String,
}

impl ScriptedTransport {
    /// Build a transport replaying `steps`.
    pub fn new(steps: impl IntoIterator<Item = ReadStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            log: ScriptLog::default(),
            close_error: None,
            remote_addr: "scripted".to_owned(),
        }
    }

    /// Report `addr` as the peer address, which keeps log assertions from
    /// matching records emitted by concurrently running tests.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    /// Make every `close` call fail with `kind`.
    #[must_use]
    pub fn with_close_error(mut self, kind: io::ErrorKind) -> Self {
        self.close_error = Some(kind);
        self
    }

    /// Handle for inspecting what the transport saw after it has been moved
    /// into a connection.
    #[must_use]
    pub fn log(&self) -> ScriptLog { self.log.clone() }
}

/// Read half of a [`ScriptedTransport`].
#[derive(Debug)]
pub struct ScriptedReader {
    steps: VecDeque<ReadStep>,
    log: ScriptLog,
}

/// Write half of a [`ScriptedTransport`].
#[derive(Debug)]
pub struct ScriptedWriter {
    log: ScriptLog,
    close_error: Option<io::ErrorKind>,
}

fn fill(buf: &mut [u8], bytes: &[u8]) -> usize {
    let n = bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    n
}

#[async_trait]
impl TransportReader for ScriptedReader {
    async fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        self.log.lock().windows.push(buf.len());
        match self.steps.pop_front() {
            Some(ReadStep::Data(bytes)) => ReadOutcome::Data(fill(buf, &bytes)),
            Some(ReadStep::Eof(bytes)) => ReadOutcome::Eof(fill(buf, &bytes)),
            Some(ReadStep::Fail(bytes, kind)) => ReadOutcome::Failed {
                read: fill(buf, &bytes),
                error: io::Error::new(kind, "scripted read failure"),
            },
            Some(ReadStep::Hang) => std::future::pending().await,
            None => ReadOutcome::Eof(0),
        }
    }
}

#[async_trait]
impl TransportWriter for ScriptedWriter {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.log.lock().written.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.log.lock().closes += 1;
        match self.close_error {
            Some(kind) => Err(io::Error::new(kind, "scripted close failure")),
            None => Ok(()),
        }
    }
}

impl Transport for ScriptedTransport {
    type Reader = ScriptedReader;
    type Writer = ScriptedWriter;

    fn remote_addr(&self) -> String { self.remote_addr.clone() }

    fn into_split(self) -> (ScriptedReader, ScriptedWriter) {
        (
            ScriptedReader {
                steps: self.steps,
                log: self.log.clone(),
            },
            ScriptedWriter {
                log: self.log,
                close_error: self.close_error,
            },
        )
    }
}
