//! Receiver configuration.

use std::{num::NonZeroUsize, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    checksum::ChecksumPolicy,
    header::{NodeId, SessionId},
    message::FIRST_FRAGMENT_PAYLOAD_OFFSET,
};

/// Largest frame the link layer delivers.
pub const FRAME_SIZE_LIMIT: usize = 1500;

/// Default number of reassembly slots.
pub const DEFAULT_POOL_CAPACITY: NonZeroUsize = NonZeroUsize::new(5).expect("five is non-zero");

/// Default age at which a buffered transaction is evicted.
pub const DEFAULT_TTL: Duration = Duration::from_millis(1000);

/// Default payload carried by every non-final fragment: a full frame minus
/// the first-fragment header and prelude.
pub const DEFAULT_FRAGMENT_PAYLOAD_CAP: NonZeroUsize =
    NonZeroUsize::new(FRAME_SIZE_LIMIT - FIRST_FRAGMENT_PAYLOAD_OFFSET)
        .expect("frame limit exceeds the first-fragment offset");

/// Default bound on a decompressed frame body.
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 3000;

/// Settings for a [`Receiver`](crate::Receiver).
///
/// # Examples
///
/// ```
/// use std::{num::NonZeroUsize, time::Duration};
///
/// use lstream::{ChecksumPolicy, NodeId, ReceiverConfig, SessionId};
///
/// let config = ReceiverConfig::default()
///     .with_node_id(NodeId::new(7))
///     .with_session_id(SessionId::new(3))
///     .with_ttl(Duration::from_millis(250))
///     .with_checksum_policy(ChecksumPolicy::Permissive);
/// assert_eq!(config.pool_capacity, NonZeroUsize::new(5).expect("non-zero"));
/// assert_eq!(config.fragment_payload_cap.get(), 1492);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// This receiver's node address.
    pub node_id: NodeId,
    /// Session accepted at start-up. Zero means no session is assigned yet.
    pub session_id: SessionId,
    /// Number of reassembly slots allocated at construction.
    pub pool_capacity: NonZeroUsize,
    /// Age at which a buffered transaction is evicted, complete or not.
    pub ttl: Duration,
    /// Exact payload size of every fragment except the last one of a
    /// transaction. Senders must honour it; reassembly offsets depend on it.
    pub fragment_payload_cap: NonZeroUsize,
    /// Upper bound on a decompressed frame body.
    pub max_decompressed_len: usize,
    /// Behaviour on checksum mismatch.
    pub checksum_policy: ChecksumPolicy,
    /// Whether compressed frames are accepted.
    pub compression_enabled: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::default(),
            session_id: SessionId::UNASSIGNED,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            ttl: DEFAULT_TTL,
            fragment_payload_cap: DEFAULT_FRAGMENT_PAYLOAD_CAP,
            max_decompressed_len: DEFAULT_MAX_DECOMPRESSED_LEN,
            checksum_policy: ChecksumPolicy::default(),
            compression_enabled: false,
        }
    }
}

impl ReceiverConfig {
    /// Set the node address.
    #[must_use]
    pub const fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = node_id;
        self
    }

    /// Set the initial session.
    #[must_use]
    pub const fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Set the number of reassembly slots.
    #[must_use]
    pub const fn with_pool_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the eviction age.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the fixed payload size of non-final fragments.
    #[must_use]
    pub const fn with_fragment_payload_cap(mut self, cap: NonZeroUsize) -> Self {
        self.fragment_payload_cap = cap;
        self
    }

    /// Set the decompressed body bound.
    #[must_use]
    pub const fn with_max_decompressed_len(mut self, limit: usize) -> Self {
        self.max_decompressed_len = limit;
        self
    }

    /// Set the checksum mismatch policy.
    #[must_use]
    pub const fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    /// Accept or refuse compressed frames.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }
}
