//! Command line interface for the `lstream-replay` binary.
//!
//! Kept free of crate types so the build script can render a man page from
//! it.

use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;

/// Replay a frame capture through a receiver and report per-status counts.
#[derive(Debug, Parser)]
#[command(
    name = "lstream-replay",
    version,
    about = "Replay a Little Stream frame capture through the receiver"
)]
pub struct Cli {
    /// Capture file of `[offset_ms u32 LE][len u16 LE][frame]` records.
    pub capture: PathBuf,
    /// Node id of the simulated receiver.
    #[arg(short, long)]
    pub node: u8,
    /// Session accepted by the simulated receiver.
    #[arg(short, long)]
    pub session: u8,
    /// Payload size of every non-final fragment.
    #[arg(long, default_value = "1492")]
    pub cap: NonZeroUsize,
    /// Number of reassembly slots.
    #[arg(long, default_value = "5")]
    pub slots: NonZeroUsize,
    /// Transaction time-to-live in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub ttl_ms: u64,
    /// Deliver transactions whose checksum does not match.
    #[arg(long)]
    pub permissive: bool,
    /// Accept DEFLATE-compressed frames.
    #[arg(long)]
    pub deflate: bool,
    /// Print each delivered payload as hex.
    #[arg(long)]
    pub hex: bool,
}
