//! Receiver engine tying the pipeline together.
//!
//! Each inbound frame flows through the same stages, and the first failing
//! stage decides the returned error:
//!
//! 1. decode the fixed header;
//! 2. check session, node and direction;
//! 3. extract the message, expanding compressed bodies;
//! 4. reject stale frame numbers;
//! 5. route the fragment into the slot pool;
//! 6. submit completed transactions to the delivery handler.
//!
//! Processing is synchronous and finishes before [`Receiver::receive`]
//! returns. The delivery handler only ever sees a borrowed payload while the
//! receiver is mutably borrowed, so a handler cannot feed frames back into
//! the receiver that is calling it.

use std::time::Instant;

use tracing::{debug, info};

use crate::{
    checksum::ChecksumPolicy,
    compression::Decompressor,
    config::ReceiverConfig,
    dispatch::{Delivery, DeliveryHandler, Dispatcher},
    error::{ReceiveError, ReceiveStatus},
    header::{FrameHeader, FrameKind, FrameNumber, NodeId, SessionId},
    message::{BodyDecoding, Message},
    metrics,
    order::{OrderGuard, check_addressing},
    reassembly::{Assembly, FragmentLayout, Reassembler},
};

/// Successful result of processing one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// The frame is not a stream frame and was not processed further.
    Ignored,
    /// The fragment was stored; its transaction is still incomplete.
    Buffered,
    /// The fragment repeats one already consumed.
    Duplicate,
    /// The fragment completed a transaction that was delivered.
    Delivered(Delivery),
}

/// Receiver-side engine for one node and one active session.
///
/// # Examples
///
/// ```
/// use std::{cell::RefCell, rc::Rc};
///
/// use lstream::{NodeId, ReceiveOutcome, Receiver, ReceiverConfig, SessionId};
///
/// let delivered = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&delivered);
/// let mut receiver = Receiver::new(
///     ReceiverConfig::default()
///         .with_node_id(NodeId::new(7))
///         .with_session_id(SessionId::new(3)),
/// );
/// receiver.set_handler(move |payload: &[u8]| sink.borrow_mut().push(payload.to_vec()));
///
/// // Stream frame, downstream, node 7, session 3, frame 1, fragment 0,
/// // declaring two bytes with checksum 0x03.
/// let frame = [0b0001_0001, 7, 3, 1, 0, 0x02, 0x00, 0x03, 0x01, 0x02];
/// let outcome = receiver.receive(&frame).expect("frame accepted");
/// assert!(matches!(outcome, ReceiveOutcome::Delivered(_)));
/// assert_eq!(*delivered.borrow(), vec![vec![0x01, 0x02]]);
/// ```
#[derive(Debug)]
pub struct Receiver {
    node_id: NodeId,
    session_id: SessionId,
    compression_enabled: bool,
    max_decompressed_len: usize,
    decompressor: Option<Box<dyn Decompressor>>,
    guard: OrderGuard,
    reassembler: Reassembler,
    dispatcher: Dispatcher,
}

impl Receiver {
    /// Build a receiver, allocating its slot pool.
    #[must_use]
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            node_id: config.node_id,
            session_id: config.session_id,
            compression_enabled: config.compression_enabled,
            max_decompressed_len: config.max_decompressed_len,
            decompressor: None,
            guard: OrderGuard::new(),
            reassembler: Reassembler::new(
                config.pool_capacity,
                config.ttl,
                FragmentLayout::new(config.fragment_payload_cap),
            ),
            dispatcher: Dispatcher::new(config.checksum_policy),
        }
    }

    /// Install the codec used for compressed frames.
    #[must_use]
    pub fn with_decompressor<D>(mut self, decompressor: D) -> Self
    where
        D: Decompressor + 'static,
    {
        self.set_decompressor(decompressor);
        self
    }

    /// Install or replace the codec used for compressed frames.
    pub fn set_decompressor<D>(&mut self, decompressor: D)
    where
        D: Decompressor + 'static,
    {
        self.decompressor = Some(Box::new(decompressor));
    }

    /// Register the delivery handler, replacing any previous one.
    pub fn set_handler<H>(&mut self, handler: H)
    where
        H: DeliveryHandler + 'static,
    {
        self.dispatcher.set_handler(handler);
    }

    /// Remove the delivery handler. Completed transactions are then dropped.
    pub fn clear_handler(&mut self) { self.dispatcher.clear_handler(); }

    /// Change this receiver's node address.
    pub fn set_node_id(&mut self, node_id: NodeId) { self.node_id = node_id; }

    /// Switch to `session_id`.
    ///
    /// The last-seen and last-submitted frame numbers are forgotten.
    /// Transactions buffered under the previous session stay in their slots
    /// until they expire, but frames of the new session never join them. A
    /// new first fragment that reuses one of their frame numbers replaces
    /// the stale slot.
    pub fn set_session_id(&mut self, session_id: SessionId) {
        info!(
            from = %self.session_id,
            to = %session_id,
            in_flight = self.reassembler.buffered_len(),
            "session changed"
        );
        self.session_id = session_id;
        self.guard.reset();
        self.dispatcher.reset();
    }

    /// Accept compressed frames.
    pub fn enable_compression(&mut self) {
        self.compression_enabled = true;
        info!("compression enabled");
    }

    /// Refuse compressed frames.
    pub fn disable_compression(&mut self) {
        self.compression_enabled = false;
        info!("compression disabled");
    }

    /// Change the checksum mismatch policy.
    pub fn set_checksum_policy(&mut self, policy: ChecksumPolicy) {
        self.dispatcher.set_policy(policy);
    }

    /// Node address.
    #[must_use]
    pub const fn node_id(&self) -> NodeId { self.node_id }

    /// Current session.
    #[must_use]
    pub const fn session_id(&self) -> SessionId { self.session_id }

    /// Whether compressed frames are accepted.
    #[must_use]
    pub const fn compression_enabled(&self) -> bool { self.compression_enabled }

    /// Checksum mismatch policy.
    #[must_use]
    pub const fn checksum_policy(&self) -> ChecksumPolicy { self.dispatcher.policy() }

    /// Number of reassembly slots.
    #[must_use]
    pub fn capacity(&self) -> usize { self.reassembler.capacity() }

    /// Number of buffered, incomplete transactions.
    #[must_use]
    pub fn in_flight(&self) -> usize { self.reassembler.buffered_len() }

    /// Frame numbers of buffered transactions, in slot order.
    #[must_use]
    pub fn in_flight_frames(&self) -> Vec<FrameNumber> { self.reassembler.buffered_frames() }

    /// Last-seen downstream frame number in the current session.
    #[must_use]
    pub const fn last_downstream_frame(&self) -> Option<FrameNumber> {
        self.guard.last_downstream()
    }

    /// Frame number of the last delivered transaction in the current session.
    #[must_use]
    pub const fn last_submitted_frame(&self) -> Option<FrameNumber> {
        self.dispatcher.last_submitted()
    }

    /// Evict expired transactions now.
    pub fn purge_expired(&mut self) -> Vec<FrameNumber> { self.purge_expired_at(Instant::now()) }

    /// Evict transactions expired at `now`.
    pub fn purge_expired_at(&mut self, now: Instant) -> Vec<FrameNumber> {
        self.reassembler.purge_expired_at(now)
    }

    /// Process one inbound frame using the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiveError`] describing the first stage that rejected the
    /// frame. The receiver stays usable after any error.
    pub fn receive(&mut self, frame: &[u8]) -> Result<ReceiveOutcome, ReceiveError> {
        self.receive_at(frame, Instant::now())
    }

    /// Process one inbound frame using an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`receive`](Self::receive).
    pub fn receive_at(
        &mut self,
        frame: &[u8],
        now: Instant,
    ) -> Result<ReceiveOutcome, ReceiveError> {
        let result = self.process(frame, now);
        let status = ReceiveStatus::from_result(&result);
        metrics::inc_frames(status);
        if let Err(err) = &result {
            debug!(status = status.as_str(), error = %err, "frame rejected");
        }
        result
    }

    /// Process one inbound frame and report only its status code.
    pub fn receive_status(&mut self, frame: &[u8]) -> ReceiveStatus {
        ReceiveStatus::from_result(&self.receive(frame))
    }

    fn process(&mut self, frame: &[u8], now: Instant) -> Result<ReceiveOutcome, ReceiveError> {
        let header = FrameHeader::parse(frame)?;
        check_addressing(&header, self.session_id, self.node_id)?;
        if header.kind() != FrameKind::Stream {
            debug!(kind = ?header.kind(), "ignoring non-stream frame");
            return Ok(ReceiveOutcome::Ignored);
        }

        let decoding = BodyDecoding {
            enabled: self.compression_enabled,
            decompressor: self.decompressor.as_deref(),
            limit: self.max_decompressed_len,
        };
        let message = Message::parse(header, frame, decoding)?;

        let frame_number = header.frame_number();
        let buffered = self.reassembler
            .is_buffered_at(self.session_id, frame_number, now);
        self.guard.check(frame_number, buffered)?;

        let assembly = self.reassembler.push_at(&message, now)?;
        self.guard.observe(frame_number);
        match assembly {
            Assembly::Pending => Ok(ReceiveOutcome::Buffered),
            Assembly::Duplicate => Ok(ReceiveOutcome::Duplicate),
            Assembly::Complete(tx) => Ok(ReceiveOutcome::Delivered(self.dispatcher.submit(tx)?)),
        }
    }
}
