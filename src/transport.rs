//! Transport abstraction consumed by a [`Connection`](crate::Connection).
//!
//! A transport is split into a read half, owned by the read loop, and a write
//! half, shared by `write` and `close` callers. [`StreamTransport`] adapts any
//! Tokio stream; [`TcpStream`] implements [`Transport`] directly.

use std::io;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

/// Result of a single read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n` bytes were written into the buffer.
    Data(usize),
    /// The peer closed the stream. Bytes delivered together with the end of
    /// the stream are still counted.
    Eof(usize),
    /// The read failed. Bytes reported alongside the error are not trusted.
    Failed {
        /// Bytes the transport claimed to have read.
        read: usize,
        /// Cause of the failure.
        error: io::Error,
    },
}

impl From<io::Result<usize>> for ReadOutcome {
    fn from(result: io::Result<usize>) -> Self {
        match result {
            Ok(0) => Self::Eof(0),
            Ok(n) => Self::Data(n),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Self::Eof(0),
            Err(error) => Self::Failed { read: 0, error },
        }
    }
}

/// Read half of a transport.
///
/// Implementations must be cancellation-safe: dropping a pending `read()`
/// future must not lose bytes already delivered to the buffer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportReader: Send + 'static {
    /// Read into `buf`, reporting how the attempt ended.
    async fn read(&mut self, buf: &mut [u8]) -> ReadOutcome;
}

/// Write half of a transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportWriter: Send + 'static {
    /// Write `bytes` once, returning how many were accepted.
    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Close the transport.
    async fn close(&mut self) -> io::Result<()>;
}

/// An established bidirectional byte stream.
pub trait Transport: Send + 'static {
    /// Read half handed to the read loop.
    type Reader: TransportReader;
    /// Write half kept by the connection.
    type Writer: TransportWriter;

    /// Peer address used in diagnostics.
    fn remote_addr(&self) -> String;

    /// Split into independently owned halves.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}

/// Reader adapter over any [`AsyncRead`].
#[derive(Debug)]
pub struct StreamReader<R>(R);

/// Writer adapter over any [`AsyncWrite`].
#[derive(Debug)]
pub struct StreamWriter<W>(W);

#[async_trait]
impl<R> TransportReader for StreamReader<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read(&mut self, buf: &mut [u8]) -> ReadOutcome { self.0.read(buf).await.into() }
}

#[async_trait]
impl<W> TransportWriter for StreamWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let n = self.0.write(bytes).await?;
        self.0.flush().await?;
        Ok(n)
    }

    async fn close(&mut self) -> io::Result<()> { self.0.shutdown().await }
}

/// Transport over a generic Tokio stream, such as a duplex pipe or a TLS
/// stream established elsewhere.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    remote_addr: String,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap `stream`, labelling its peer as `remote_addr` in diagnostics.
    pub fn new(stream: S, remote_addr: impl Into<String>) -> Self {
        Self {
            stream,
            remote_addr: remote_addr.into(),
        }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    type Reader = StreamReader<ReadHalf<S>>;
    type Writer = StreamWriter<WriteHalf<S>>;

    fn remote_addr(&self) -> String { self.remote_addr.clone() }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let (read, write) = tokio::io::split(self.stream);
        (StreamReader(read), StreamWriter(write))
    }
}

impl Transport for TcpStream {
    type Reader = StreamReader<OwnedReadHalf>;
    type Writer = StreamWriter<OwnedWriteHalf>;

    fn remote_addr(&self) -> String {
        self.peer_addr()
            .map_or_else(|_| String::from("<unknown>"), |addr| addr.to_string())
    }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let (read, write) = TcpStream::into_split(self);
        (StreamReader(read), StreamWriter(write))
    }
}
