//! Offline replay tool for Little Stream captures.
//!
//! Feeds every captured frame through a [`Receiver`] at its recorded arrival
//! time and prints the number of frames per status code.

mod cli;

use std::{fs, time::Instant};

use clap::Parser;
use lstream::{
    ChecksumPolicy,
    NodeId,
    ReceiveStatus,
    Receiver,
    ReceiverConfig,
    SessionId,
    capture::CaptureReader,
};

const STATUS_CODES: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let capture = fs::read(&cli.capture)?;

    let policy = if cli.permissive {
        ChecksumPolicy::Permissive
    } else {
        ChecksumPolicy::Strict
    };
    let config = ReceiverConfig::default()
        .with_node_id(NodeId::new(cli.node))
        .with_session_id(SessionId::new(cli.session))
        .with_fragment_payload_cap(cli.cap)
        .with_pool_capacity(cli.slots)
        .with_ttl(std::time::Duration::from_millis(cli.ttl_ms))
        .with_checksum_policy(policy);
    let mut receiver = Receiver::new(config);
    if cli.deflate {
        enable_deflate(&mut receiver)?;
    }

    let show_hex = cli.hex;
    receiver.set_handler(move |payload: &[u8]| {
        if show_hex {
            println!("{}", hex::encode(payload));
        } else {
            println!("delivered {} bytes", payload.len());
        }
    });

    let start = Instant::now();
    let mut counts = [0_usize; STATUS_CODES];
    for record in CaptureReader::new(&capture) {
        let record = record?;
        let now = start
            .checked_add(record.offset)
            .ok_or("capture offset overflows the clock")?;
        let status = ReceiveStatus::from_result(&receiver.receive_at(record.frame, now));
        if let Some(count) = counts.get_mut(usize::from(status.code())) {
            *count += 1;
        }
    }

    for (code, count) in (0_u8..).zip(counts) {
        if let Ok(status) = ReceiveStatus::try_from(code) {
            println!("{:>2} {:<20} {count}", status.code(), status.as_str());
        }
    }
    Ok(())
}

#[cfg(feature = "deflate")]
#[expect(
    clippy::unnecessary_wraps,
    reason = "signature matches the build without DEFLATE support"
)]
fn enable_deflate(receiver: &mut Receiver) -> Result<(), Box<dyn std::error::Error>> {
    receiver.set_decompressor(lstream::compression::DeflateDecompressor);
    receiver.enable_compression();
    Ok(())
}

#[cfg(not(feature = "deflate"))]
fn enable_deflate(_receiver: &mut Receiver) -> Result<(), Box<dyn std::error::Error>> {
    Err("lstream-replay was built without the `deflate` feature".into())
}
