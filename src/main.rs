//! Tap binary for `framelink`.
//!
//! Dials a TCP peer, prints every decoded message, and exits when the read
//! loop stops.

mod cli;

use std::{error::Error, fmt::Write as _, sync::Arc};

use clap::Parser;
use framelink::{Connection, ConnectionConfig, LoopExit, RawMessage};
use tokio::{net::TcpStream, sync::mpsc};

type BoxError = Box<dyn Error + Send + Sync>;

const PREVIEW_LEN: usize = 16;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_exporter(addr)?;
    }

    let config = ConnectionConfig::new(
        usize::try_from(cli.read_buffer_size)?,
        usize::try_from(cli.read_failure_limit)?,
    )?;
    let stream = TcpStream::connect(&cli.connect).await?;
    let mut conn = Connection::new(stream, Some(Arc::new(config)));
    let (tx, mut rx) = mpsc::channel(usize::try_from(cli.channel_capacity)?);
    conn.set_delivery_channel(tx);
    conn.start();

    while let Some(message) = rx.recv().await {
        println!("{}", describe(&message));
    }

    match conn.wait().await {
        Some(LoopExit::EndOfStream) => {
            tracing::info!(peer_addr = conn.remote_addr(), "peer closed the stream");
            Ok(())
        }
        Some(exit) => Err(exit.to_string().into()),
        None => Err("read loop never started".into()),
    }
}

/// One-line summary of a message: its length and a hex preview.
fn describe(message: &RawMessage) -> String {
    let payload = message.payload();
    let mut line = format!("len={} data=", payload.len());
    for byte in payload.iter().take(PREVIEW_LEN) {
        let _ = write!(line, "{byte:02x}");
    }
    if payload.len() > PREVIEW_LEN {
        line.push_str("..");
    }
    line
}

#[cfg(feature = "metrics")]
fn install_exporter(addr: std::net::SocketAddr) -> Result<(), BoxError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(%addr, "serving metrics");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_exporter(addr: std::net::SocketAddr) -> Result<(), BoxError> {
    tracing::warn!(%addr, "built without the metrics feature; not serving metrics");
    Ok(())
}
