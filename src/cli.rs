//! Command line interface for the `framelink` tap binary.
//!
//! Dials a peer, runs one connection, and prints what it decodes.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `framelink` binary.
#[derive(Debug, Parser)]
#[command(
    name = "framelink",
    version,
    about = "Print length-prefixed messages read from a TCP peer",
    after_help = "Examples:\n  \
        framelink --connect 127.0.0.1:7000\n  \
        framelink --connect 10.0.0.5:9000 --read-buffer-size 512 --metrics-addr 127.0.0.1:9100"
)]
pub struct Cli {
    /// Address of the peer to dial.
    #[arg(short, long)]
    pub connect: String,

    /// Capacity of each half of the read buffer, in bytes.
    #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u32).range(1..))]
    pub read_buffer_size: u32,

    /// Consecutive read failures tolerated before giving up.
    #[arg(long, default_value_t = 3)]
    pub read_failure_limit: u32,

    /// Number of decoded messages buffered before the reader waits.
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..))]
    pub channel_capacity: u32,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
