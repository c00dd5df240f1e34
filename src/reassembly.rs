//! Fragment routing and reassembly.
//!
//! [`Reassembler`] drives each slot through its lifecycle: a first fragment
//! opens a transaction, continuation fragments are written at fixed offsets,
//! and the fragment that fills the declared size hands the finished
//! [`Transaction`] back to the caller for submission.
//!
//! Offsets are implied, not transmitted. Every fragment except the last must
//! carry exactly [`FragmentLayout::cap`] payload bytes, so fragment `n` lands
//! at `cap * n`. Continuations are accepted strictly in index order; every
//! write is bounds-checked against the size declared by fragment 0 before
//! the buffer is touched.
//!
//! Transactions are keyed by session and frame number. A first fragment that
//! reuses the frame number of a slot opened in an earlier session replaces
//! that slot instead of being taken for a duplicate.

use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{
    error::ReassemblyError,
    header::{FragmentIndex, FrameNumber, SessionId},
    message::{FirstFragment, Message},
    pool::{SlotPool, Transaction},
};

/// Number of fragments addressable by the 8-bit fragment index.
const MAX_FRAGMENTS: usize = 1 << u8::BITS;

/// Fixed-size fragment geometry shared by sender and receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentLayout {
    cap: NonZeroUsize,
}

impl FragmentLayout {
    /// Create a layout where non-final fragments carry `cap` bytes.
    #[must_use]
    pub const fn new(cap: NonZeroUsize) -> Self { Self { cap } }

    /// Payload size of every non-final fragment.
    #[must_use]
    pub const fn cap(&self) -> usize { self.cap.get() }

    /// Largest transaction the fragment index can address.
    #[must_use]
    pub const fn max_transaction_len(&self) -> usize { self.cap.get().saturating_mul(MAX_FRAGMENTS) }

    /// Buffer offset for the continuation that follows `chunks` received
    /// fragments (fragment 0 included).
    ///
    /// Fragment 0 fills `[0, cap)`, the second fragment starts at `cap`, and
    /// each further fragment adds another `cap`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZeroUsize;
    ///
    /// use lstream::reassembly::FragmentLayout;
    ///
    /// let layout = FragmentLayout::new(NonZeroUsize::new(500).expect("non-zero"));
    /// assert_eq!(layout.offset_after(1), 500);
    /// assert_eq!(layout.offset_after(3), 1500);
    /// ```
    #[must_use]
    pub const fn offset_after(&self, chunks: usize) -> usize {
        let cap = self.cap.get();
        cap.saturating_add(cap.saturating_mul(chunks.saturating_sub(1)))
    }

    fn check_first(
        &self,
        frame: FrameNumber,
        first: FirstFragment,
        len: usize,
    ) -> Result<(), ReassemblyError> {
        let total = usize::from(first.total_len());
        let limit = self.max_transaction_len();
        if total > limit {
            return Err(ReassemblyError::TransactionTooLarge {
                frame,
                declared: total,
                limit,
            });
        }
        self.check_span(frame, 0, len, total)
    }

    fn check_span(
        &self,
        frame: FrameNumber,
        offset: usize,
        len: usize,
        total: usize,
    ) -> Result<(), ReassemblyError> {
        let out_of_bounds = ReassemblyError::FragmentOutOfBounds {
            frame,
            offset,
            len,
            total,
        };
        let end = offset.checked_add(len).ok_or(out_of_bounds)?;
        if end > total {
            return Err(out_of_bounds);
        }
        if end < total && len != self.cap() {
            return Err(ReassemblyError::IrregularFragment {
                frame,
                len,
                cap: self.cap(),
            });
        }
        Ok(())
    }
}

/// Result of feeding one fragment to the [`Reassembler`].
#[derive(Debug)]
pub enum Assembly {
    /// The fragment was stored; more are required.
    Pending,
    /// The fragment repeats one already consumed; nothing changed.
    Duplicate,
    /// The transaction is complete and no longer occupies a slot.
    Complete(Transaction),
}

/// Slot pool plus the state machine that fills it.
#[derive(Debug)]
pub struct Reassembler {
    pool: SlotPool,
    layout: FragmentLayout,
    next_index: u64,
}

impl Reassembler {
    /// Create a reassembler with `capacity` slots evicted after `ttl`.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, ttl: Duration, layout: FragmentLayout) -> Self {
        Self {
            pool: SlotPool::new(capacity, ttl),
            layout,
            next_index: 0,
        }
    }

    /// Fragment geometry in use.
    #[must_use]
    pub const fn layout(&self) -> FragmentLayout { self.layout }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize { self.pool.capacity() }

    /// Number of buffered transactions.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.pool.occupied() }

    /// Frame numbers of buffered transactions.
    #[must_use]
    pub fn buffered_frames(&self) -> Vec<FrameNumber> { self.pool.frames() }

    /// Report whether `frame` belongs to a live transaction buffered for
    /// `session`.
    pub fn is_buffered_at(&mut self, session: SessionId, frame: FrameNumber, now: Instant) -> bool {
        self.pool.contains_at(session, frame, now)
    }

    /// Evict expired transactions, returning their frame numbers.
    pub fn purge_expired_at(&mut self, now: Instant) -> Vec<FrameNumber> {
        self.pool.purge_expired_at(now)
    }

    /// Feed one fragment into the pool.
    ///
    /// A first fragment whose payload already satisfies the declared size
    /// completes immediately without occupying a slot.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the fragment breaks the fixed-size
    /// layout, would write out of bounds, skips ahead of the expected index,
    /// has no transaction to join, or cannot be admitted because the pool is
    /// full. Rejected fragments never modify existing slots.
    pub fn push_at(
        &mut self,
        message: &Message<'_>,
        now: Instant,
    ) -> Result<Assembly, ReassemblyError> {
        self.pool.purge_expired_at(now);
        match message.first_fragment() {
            Some(first) => self.open(message, first, now),
            None => self.append(message),
        }
    }

    fn open(
        &mut self,
        message: &Message<'_>,
        first: FirstFragment,
        now: Instant,
    ) -> Result<Assembly, ReassemblyError> {
        let session = message.header().session_id();
        let frame = message.header().frame_number();
        if self.pool.get_mut(session, frame).is_some() {
            debug!(%frame, "duplicate first fragment");
            return Ok(Assembly::Duplicate);
        }
        self.layout.check_first(frame, first, message.len())?;
        self.pool.evict_stale(session, frame);

        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1);
        let tx = Transaction::start(index, session, frame, first, message.payload(), now);
        if tx.is_complete() {
            debug!(%frame, index, len = tx.total_len(), "single-fragment transaction");
            return Ok(Assembly::Complete(tx));
        }

        self.pool.admit_at(tx, now)?;
        debug!(
            %frame,
            index,
            received = message.len(),
            total = first.total_len(),
            "opened transaction"
        );
        Ok(Assembly::Pending)
    }

    fn append(&mut self, message: &Message<'_>) -> Result<Assembly, ReassemblyError> {
        let header = message.header();
        let session = header.session_id();
        let frame = header.frame_number();
        let found = header.fragment_index();
        let layout = self.layout;

        let tx = self
            .pool
            .get_mut(session, frame)
            .ok_or(ReassemblyError::UnknownTransaction {
                frame,
                index: found,
            })?;

        let position = usize::from(found.get());
        if position < tx.chunks() {
            debug!(%frame, fragment = %found, "duplicate fragment");
            return Ok(Assembly::Duplicate);
        }
        if position > tx.chunks() {
            return Err(ReassemblyError::FragmentIndexMismatch {
                frame,
                expected: tx.next_fragment().unwrap_or(FragmentIndex::new(u8::MAX)),
                found,
            });
        }

        let offset = layout.offset_after(tx.chunks());
        layout.check_span(frame, offset, message.len(), tx.total_len())?;
        tx.write_fragment(offset, message.payload());
        debug!(
            %frame,
            fragment = %found,
            received = tx.received(),
            total = tx.total_len(),
            "appended fragment"
        );

        if !tx.is_complete() {
            return Ok(Assembly::Pending);
        }
        Ok(self
            .pool
            .take(session, frame)
            .map_or(Assembly::Pending, Assembly::Complete))
    }
}
