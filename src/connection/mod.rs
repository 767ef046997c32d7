//! A single byte-stream connection and its detached read loop.
//!
//! [`Connection`] owns an established [`Transport`]. Starting it spawns one
//! Tokio task that reads from the transport, decodes messages, and publishes
//! them to the delivery channel bound with
//! [`set_delivery_channel`](Connection::set_delivery_channel). Writes bypass
//! the loop and go straight to the transport.

mod read_loop;
mod tracker;

use std::{any::Any, io, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use log::{error, warn};
pub use read_loop::LoopExit;
use read_loop::ReadLoop;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use tracker::LoopTracker;
pub use tracker::running_connection_count;

use crate::{
    config::{ConnectionConfig, default_config},
    decoder::{MessageDecoder, RawMessageParser},
    transport::{Transport, TransportReader, TransportWriter},
};

/// One live transport endpoint driving exactly one read loop.
///
/// # Examples
///
/// ```no_run
/// use framelink::{Connection, decoder::RawMessage};
/// use tokio::{net::TcpStream, sync::mpsc};
///
/// # async fn example() -> std::io::Result<()> {
/// let stream = TcpStream::connect("127.0.0.1:7000").await?;
/// let mut conn = Connection::new(stream, None);
/// let (tx, mut rx) = mpsc::channel::<RawMessage>(16);
/// conn.set_delivery_channel(tx);
/// conn.start();
/// while let Some(msg) = rx.recv().await {
///     println!("{} bytes", msg.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connection<T: Transport, D: MessageDecoder = RawMessageParser> {
    writer: Mutex<Option<T::Writer>>,
    idle: Option<(T::Reader, D)>,
    config: Arc<ConnectionConfig>,
    delivery: Option<mpsc::Sender<D::Message>>,
    running: bool,
    shutdown: CancellationToken,
    remote_addr: Arc<str>,
    task: Option<JoinHandle<LoopExit>>,
}

impl<T: Transport> Connection<T> {
    /// Bind a connection to `transport` using the default
    /// [`RawMessageParser`].
    ///
    /// When `config` is `None` the shared [`default_config`] is used.
    #[must_use]
    pub fn new(transport: T, config: Option<Arc<ConnectionConfig>>) -> Self {
        Self::with_decoder(transport, RawMessageParser::new(), config)
    }
}

impl<T, D> Connection<T, D>
where
    T: Transport,
    D: MessageDecoder,
{
    /// Bind a connection to `transport` with a custom decoder.
    ///
    /// When `config` is `None` the shared [`default_config`] is used.
    #[must_use]
    pub fn with_decoder(transport: T, decoder: D, config: Option<Arc<ConnectionConfig>>) -> Self {
        let remote_addr: Arc<str> = transport.remote_addr().into();
        let (reader, writer) = transport.into_split();
        Self {
            writer: Mutex::new(Some(writer)),
            idle: Some((reader, decoder)),
            config: config.unwrap_or_else(default_config),
            delivery: None,
            running: false,
            shutdown: CancellationToken::new(),
            remote_addr,
            task: None,
        }
    }

    /// Bind the channel completed messages are published to.
    ///
    /// Must be called before [`start`](Self::start); once the loop runs the
    /// call is ignored and a warning is logged. The loop takes ownership of
    /// the sender, so receivers observe the end of the channel when the loop
    /// stops.
    pub fn set_delivery_channel(&mut self, sender: mpsc::Sender<D::Message>) {
        if self.running {
            warn!(
                "delivery channel set after start ignored: peer_addr={}",
                self.remote_addr
            );
            return;
        }
        self.delivery = Some(sender);
    }

    /// Spawn the read loop on the current Tokio runtime.
    ///
    /// Calling `start` again is a no-op. The call returns immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        let Some((reader, decoder)) = self.idle.take() else {
            return;
        };
        self.running = true;
        let read_loop = ReadLoop::new(
            reader,
            decoder,
            Arc::clone(&self.config),
            self.delivery.take(),
            self.shutdown.clone(),
            Arc::clone(&self.remote_addr),
        );
        let span = tracing::info_span!("read_loop", peer_addr = %self.remote_addr);
        self.task = Some(tokio::spawn(
            run_detached(read_loop, Arc::clone(&self.remote_addr)).instrument(span),
        ));
    }

    /// Close the transport and signal the read loop to stop.
    ///
    /// The write half is shut down and released here; the read loop releases
    /// the read half as it exits, at which point the transport is fully
    /// closed. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error. Once closed, further calls return
    /// [`io::ErrorKind::NotConnected`].
    pub async fn close(&self) -> io::Result<()> {
        self.shutdown.cancel();
        let mut writer = self.writer.lock().await.take().ok_or_else(not_connected)?;
        writer.close().await
    }

    /// Write `bytes` straight to the transport.
    ///
    /// The bytes are neither framed nor buffered.
    ///
    /// # Errors
    ///
    /// Returns the transport's write error, or
    /// [`io::ErrorKind::NotConnected`] after [`close`](Self::close).
    pub async fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        match self.writer.lock().await.as_mut() {
            Some(writer) => writer.write(bytes).await,
            None => Err(not_connected()),
        }
    }

    /// Peer address captured when the connection was created.
    #[must_use]
    pub fn remote_addr(&self) -> &str { &self.remote_addr }

    /// Configuration in effect for this connection.
    #[must_use]
    pub fn config(&self) -> &Arc<ConnectionConfig> { &self.config }

    /// Whether the read loop has been started and has not yet exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the read loop to exit and report why it stopped.
    ///
    /// Returns `None` if the connection was never started or the exit reason
    /// has already been collected.
    pub async fn wait(&mut self) -> Option<LoopExit> {
        let task = self.task.take()?;
        Some(match task.await {
            Ok(exit) => exit,
            Err(e) if e.is_panic() => LoopExit::Panicked,
            Err(_) => LoopExit::Closed,
        })
    }
}

/// Run a read loop as a detached task, logging and absorbing any panic.
async fn run_detached<R, D>(read_loop: ReadLoop<R, D>, peer: Arc<str>) -> LoopExit
where
    R: TransportReader,
    D: MessageDecoder,
{
    let mut tracker = LoopTracker::start(Arc::clone(&peer));

    let exit = match AssertUnwindSafe(read_loop.run()).catch_unwind().await {
        Ok(exit) => exit,
        Err(panic) => {
            let panic_msg = panic_message(&*panic);
            error!("read loop panicked: panic={panic_msg}, peer_addr={peer}");
            LoopExit::Panicked
        }
    };

    tracker.finish(exit)
}

fn not_connected() -> io::Error { io::Error::new(io::ErrorKind::NotConnected, "connection closed") }

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else {
        format!("{payload:?}")
    }
}
