#![doc(html_root_url = "https://docs.rs/lstream/latest")]
//! Receiver-side engine for the Little Stream fragment transport.
//!
//! Little Stream carries application transactions over a link whose frames
//! hold at most 1500 bytes. Senders split each transaction into fixed-size
//! fragments; a [`Receiver`] validates every inbound frame, reassembles the
//! fragments in a small pool of transaction slots, verifies the XOR checksum
//! and hands the finished payload to a [`DeliveryHandler`].
//!
//! The engine is synchronous and single-threaded: [`Receiver::receive`]
//! finishes all processing, including delivery, before it returns.

pub mod byte_order;
pub mod capture;
pub mod checksum;
pub mod compression;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod header;
pub mod message;
pub mod metrics;
pub mod order;
pub mod pool;
pub mod reassembly;
pub mod receiver;

pub use checksum::ChecksumPolicy;
pub use compression::Decompressor;
#[cfg(feature = "deflate")]
pub use compression::DeflateDecompressor;
pub use config::ReceiverConfig;
pub use dispatch::{Delivery, DeliveryHandler};
pub use error::{
    DecompressError,
    DispatchError,
    HeaderError,
    MessageError,
    ReassemblyError,
    ReceiveError,
    ReceiveStatus,
};
pub use header::{
    Direction,
    FragmentIndex,
    FrameHeader,
    FrameKind,
    FrameNumber,
    NodeId,
    SessionId,
};
pub use receiver::{ReceiveOutcome, Receiver};
