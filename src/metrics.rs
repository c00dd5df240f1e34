//! Metric helpers for `lstream`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

use crate::error::ReceiveStatus;

/// Name of the counter tracking inbound frames, labelled by status.
pub const FRAMES_RECEIVED: &str = "lstream_frames_received_total";
/// Name of the counter tracking transactions handed to the application.
pub const TRANSACTIONS_DELIVERED: &str = "lstream_transactions_delivered_total";
/// Name of the counter tracking transactions dropped by TTL eviction.
pub const TRANSACTIONS_EVICTED: &str = "lstream_transactions_evicted_total";
/// Name of the gauge tracking occupied reassembly slots.
pub const SLOTS_IN_USE: &str = "lstream_slots_in_use";

impl ReceiveStatus {
    /// Label used for this status in metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoFailure => "no_failure",
            Self::ZeroSession => "zero_session",
            Self::BadHeader => "bad_header",
            Self::InvalidSession => "invalid_session",
            Self::IncorrectNode => "incorrect_node",
            Self::BadFrameOrder => "bad_frame_order",
            Self::CompressionFailure => "compression_failure",
            Self::OtherFailure => "other_failure",
        }
    }
}

/// Record an inbound frame and the status it produced.
pub fn inc_frames(status: ReceiveStatus) {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(FRAMES_RECEIVED, "status" => status.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = status;
}

/// Record a delivered transaction.
pub fn inc_delivered() {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(TRANSACTIONS_DELIVERED).increment(1);
}

/// Record a transaction evicted by TTL.
pub fn inc_evicted() {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(TRANSACTIONS_EVICTED).increment(1);
}

/// Publish the number of occupied slots.
pub fn set_slots_in_use(occupied: usize) {
    #[cfg(feature = "metrics")]
    #[expect(
        clippy::cast_precision_loss,
        reason = "slot counts are tiny and exact in f64"
    )]
    ::metrics::gauge!(SLOTS_IN_USE).set(occupied as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = occupied;
}
