//! Unit tests for the read loop driven by a mocked transport reader.

use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use mockall::Sequence;
use rstest::rstest;
use tokio::{sync::mpsc, time::timeout};
use tokio_util::sync::CancellationToken;

use super::{LoopExit, ReadLoop};
use crate::{
    config::ConnectionConfig,
    decoder::{DecodeFailure, MessageDecoder, RawMessage, RawMessageParser},
    test_helpers::frame,
    transport::{MockTransportReader, ReadOutcome, TransportReader},
};

#[derive(Clone, Copy, Debug)]
enum Step {
    Data(&'static [u8]),
    Eof(&'static [u8]),
    Fail(&'static [u8]),
}

impl Step {
    fn apply(self, buf: &mut [u8]) -> ReadOutcome {
        match self {
            Step::Data(bytes) => ReadOutcome::Data(fill(buf, bytes)),
            Step::Eof(bytes) => ReadOutcome::Eof(fill(buf, bytes)),
            Step::Fail(bytes) => ReadOutcome::Failed {
                read: fill(buf, bytes),
                error: io::Error::from(io::ErrorKind::ConnectionReset),
            },
        }
    }
}

fn fill(buf: &mut [u8], bytes: &[u8]) -> usize {
    buf[..bytes.len()].copy_from_slice(bytes);
    bytes.len()
}

/// Build a reader that replays `steps` in order and asserts every read window
/// is exactly `window` bytes. Any read past the script fails the test.
fn scripted(steps: &[Step], window: usize) -> MockTransportReader {
    let mut reader = MockTransportReader::new();
    let mut seq = Sequence::new();
    for &step in steps {
        reader
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |buf| {
                assert_eq!(buf.len(), window, "read window must be one half-buffer");
                step.apply(buf)
            });
    }
    reader
}

fn leak(bytes: Vec<u8>) -> &'static [u8] { Box::leak(bytes.into_boxed_slice()) }

fn config(buffer: usize, limit: usize) -> Arc<ConnectionConfig> {
    Arc::new(ConnectionConfig::new(buffer, limit).expect("valid config"))
}

fn read_loop<R, D>(
    reader: R,
    decoder: D,
    config: Arc<ConnectionConfig>,
    tx: Option<mpsc::Sender<D::Message>>,
) -> ReadLoop<R, D>
where
    R: TransportReader,
    D: MessageDecoder,
{
    ReadLoop::new(
        reader,
        decoder,
        config,
        tx,
        CancellationToken::new(),
        Arc::from("test-peer"),
    )
}

/// Decoder wrapper recording how many bytes each `consume` call was offered.
struct Recording {
    inner: RawMessageParser,
    offered: Arc<Mutex<Vec<usize>>>,
}

impl MessageDecoder for Recording {
    type Message = RawMessage;

    fn consume(&mut self, src: &[u8]) -> Result<usize, DecodeFailure> {
        self.offered.lock().expect("offered lock").push(src.len());
        self.inner.consume(src)
    }

    fn fetch_message(&mut self) -> Option<RawMessage> { self.inner.fetch_message() }
}

fn drain(rx: &mut mpsc::Receiver<RawMessage>) -> Vec<Bytes> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg.into_payload());
    }
    out
}

#[tokio::test]
async fn consecutive_failures_trip_the_ceiling_without_another_read() {
    let reader = scripted(&[Step::Fail(b""), Step::Fail(b"xx"), Step::Fail(b"")], 16);
    let exit = read_loop(reader, RawMessageParser::new(), config(16, 3), None)
        .run()
        .await;
    assert_eq!(exit, LoopExit::FailureLimit { failures: 3 });
}

#[tokio::test]
async fn zero_failure_limit_never_reads() {
    let reader = MockTransportReader::new();
    let exit = read_loop(reader, RawMessageParser::new(), config(16, 0), None)
        .run()
        .await;
    assert_eq!(exit, LoopExit::FailureLimit { failures: 0 });
}

#[tokio::test]
async fn successful_read_resets_the_failure_counter() {
    let msg = leak(frame(b"ok"));
    let reader = scripted(
        &[
            Step::Fail(b""),
            Step::Fail(b""),
            Step::Data(msg),
            Step::Fail(b""),
            Step::Fail(b""),
            Step::Eof(b""),
        ],
        16,
    );
    let (tx, mut rx) = mpsc::channel(4);
    let exit = read_loop(reader, RawMessageParser::new(), config(16, 3), Some(tx))
        .run()
        .await;
    assert_eq!(exit, LoopExit::EndOfStream);
    assert_eq!(drain(&mut rx), vec![Bytes::from_static(b"ok")]);
}

#[tokio::test]
async fn bytes_returned_with_an_error_are_discarded() {
    let msg = leak(frame(b"kept"));
    let reader = scripted(
        &[Step::Fail(b"\x00\x00\x00\x09junk"), Step::Data(msg), Step::Eof(b"")],
        16,
    );
    let (tx, mut rx) = mpsc::channel(4);
    let exit = read_loop(reader, RawMessageParser::new(), config(16, 3), Some(tx))
        .run()
        .await;
    assert_eq!(exit, LoopExit::EndOfStream);
    assert_eq!(drain(&mut rx), vec![Bytes::from_static(b"kept")]);
}

#[tokio::test]
async fn message_split_two_then_three_is_published_once() {
    let bytes = frame(b"z");
    assert_eq!(bytes.len(), 5);
    let first = leak(bytes[..2].to_vec());
    let second = leak(bytes[2..].to_vec());
    let reader = scripted(&[Step::Data(first), Step::Data(second), Step::Eof(b"")], 8);
    let offered = Arc::new(Mutex::new(Vec::new()));
    let decoder = Recording {
        inner: RawMessageParser::new(),
        offered: Arc::clone(&offered),
    };
    let (tx, mut rx) = mpsc::channel(4);

    let exit = read_loop(reader, decoder, config(8, 3), Some(tx)).run().await;

    assert_eq!(exit, LoopExit::EndOfStream);
    assert_eq!(*offered.lock().expect("offered lock"), vec![2, 3]);
    assert_eq!(drain(&mut rx), vec![Bytes::from_static(b"z")]);
}

#[tokio::test]
async fn end_of_stream_with_trailing_bytes_completes_the_message() {
    let bytes = frame(b"tail");
    let head = leak(bytes[..4].to_vec());
    let tail = leak(bytes[4..].to_vec());
    let reader = scripted(&[Step::Data(head), Step::Eof(tail), Step::Eof(b"")], 16);
    let (tx, mut rx) = mpsc::channel(4);

    let exit = read_loop(reader, RawMessageParser::new(), config(16, 3), Some(tx))
        .run()
        .await;

    assert_eq!(exit, LoopExit::EndOfStream);
    assert_eq!(drain(&mut rx), vec![Bytes::from_static(b"tail")]);
}

#[tokio::test]
async fn message_straddling_the_recycle_boundary_is_intact() {
    // Buffer halves of 8 bytes; a 14-byte frame arrives as 6 + 8 bytes so the
    // cursor passes the half boundary mid-message and is recycled.
    let mut stream = frame(b"0123456789");
    stream.extend(frame(b"abc"));
    let reads: Vec<&'static [u8]> = vec![
        leak(stream[..6].to_vec()),
        leak(stream[6..14].to_vec()),
        leak(stream[14..].to_vec()),
    ];
    let reader = scripted(
        &[
            Step::Data(reads[0]),
            Step::Data(reads[1]),
            Step::Data(reads[2]),
            Step::Eof(b""),
        ],
        8,
    );
    let (tx, mut rx) = mpsc::channel(4);

    let exit = read_loop(reader, RawMessageParser::new(), config(8, 3), Some(tx))
        .run()
        .await;

    assert_eq!(exit, LoopExit::EndOfStream);
    assert_eq!(
        drain(&mut rx),
        vec![
            Bytes::from_static(b"0123456789"),
            Bytes::from_static(b"abc")
        ]
    );
}

#[tokio::test]
async fn decode_errors_do_not_count_as_read_failures() {
    let mut bytes = frame(&[1u8; 100]);
    bytes.extend(frame(b"after"));
    let reader = scripted(
        &[
            Step::Fail(b""),
            Step::Data(leak(bytes)),
            Step::Fail(b""),
            Step::Eof(b""),
        ],
        256,
    );
    let (tx, mut rx) = mpsc::channel(4);
    let decoder = RawMessageParser::with_max_message_length(64);

    let exit = read_loop(reader, decoder, config(256, 2), Some(tx)).run().await;

    assert_eq!(exit, LoopExit::EndOfStream);
    assert_eq!(drain(&mut rx), vec![Bytes::from_static(b"after")]);
}

#[rstest]
#[case::no_channel(false)]
#[case::receiver_dropped(true)]
#[tokio::test]
async fn undeliverable_messages_are_dropped_and_reading_continues(#[case] bound: bool) {
    let mut bytes = frame(b"a");
    bytes.extend(frame(b"b"));
    let reader = scripted(&[Step::Data(leak(bytes)), Step::Eof(b"")], 16);
    let tx = bound.then(|| {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        tx
    });

    let exit = read_loop(reader, RawMessageParser::new(), config(16, 3), tx)
        .run()
        .await;

    assert_eq!(exit, LoopExit::EndOfStream);
}

#[tokio::test]
async fn full_channel_blocks_the_loop_until_the_consumer_drains() {
    let mut bytes = frame(b"1");
    bytes.extend(frame(b"2"));
    let reader = scripted(&[Step::Data(leak(bytes)), Step::Eof(b"")], 16);
    let (tx, mut rx) = mpsc::channel(1);
    let mut task = tokio::spawn(
        read_loop(reader, RawMessageParser::new(), config(16, 3), Some(tx)).run(),
    );

    assert!(
        timeout(Duration::from_millis(50), &mut task).await.is_err(),
        "loop should be parked on the second send"
    );

    assert_eq!(rx.recv().await.map(RawMessage::into_payload), Some(Bytes::from_static(b"1")));
    assert_eq!(rx.recv().await.map(RawMessage::into_payload), Some(Bytes::from_static(b"2")));
    assert_eq!(task.await.expect("loop task"), LoopExit::EndOfStream);
}

struct PendingReader;

#[async_trait]
impl TransportReader for PendingReader {
    async fn read(&mut self, _buf: &mut [u8]) -> ReadOutcome { std::future::pending().await }
}

#[tokio::test]
async fn cancellation_unblocks_a_pending_read() {
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(
        ReadLoop::new(
            PendingReader,
            RawMessageParser::new(),
            config(16, 3),
            None,
            shutdown.clone(),
            Arc::from("test-peer"),
        )
        .run(),
    );
    shutdown.cancel();
    assert_eq!(task.await.expect("loop task"), LoopExit::Closed);
}

/// Decoder that never consumes anything and never completes a message.
struct Stalled;

impl MessageDecoder for Stalled {
    type Message = RawMessage;

    fn consume(&mut self, _src: &[u8]) -> Result<usize, DecodeFailure> { Ok(0) }

    fn fetch_message(&mut self) -> Option<RawMessage> { None }
}

#[tokio::test]
async fn stalled_decoder_does_not_spin() {
    let reader = scripted(&[Step::Data(b"abc"), Step::Eof(b"")], 16);
    let exit = read_loop(reader, Stalled, config(16, 3), None).run().await;
    assert_eq!(exit, LoopExit::EndOfStream);
}

#[test]
fn loop_exit_labels_are_stable() {
    assert_eq!(LoopExit::FailureLimit { failures: 2 }.as_str(), "failure_limit");
    assert_eq!(LoopExit::EndOfStream.as_str(), "end_of_stream");
    assert_eq!(
        LoopExit::FailureLimit { failures: 2 }.to_string(),
        "gave up after 2 consecutive read failures"
    );
}
