//! Fixed-capacity pool of reassembly slots.
//!
//! Slots are allocated once when the pool is built and reused in place. An
//! empty slot holds `None`; an occupied slot owns a [`Transaction`] whose
//! payload buffer was sized from the declared total when fragment 0 arrived.
//! Dropping the transaction (on eviction or hand-off for submission) frees
//! the buffer, so no slot can outlive its buffer or vice versa.
//!
//! Slots belong to the session that opened them. Lookups match both the
//! session and the frame number, so a transaction left over from an earlier
//! session is never extended by frames of the current one.
//!
//! Expiry is lazy: every lookup or admission first sweeps the pool and drops
//! any transaction whose age has reached the TTL.

use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use tracing::warn;

use crate::{
    error::ReassemblyError,
    header::{FragmentIndex, FrameNumber, SessionId},
    message::FirstFragment,
    metrics,
};

/// One in-progress transaction.
#[derive(Debug)]
pub struct Transaction {
    index: u64,
    session: SessionId,
    frame: FrameNumber,
    received: usize,
    chunks: usize,
    payload: Vec<u8>,
    checksum: u8,
    started_at: Instant,
}

impl Transaction {
    /// Start a transaction from its first fragment, copying `payload` to the
    /// front of a buffer sized to the declared total.
    ///
    /// The caller guarantees `payload.len()` does not exceed the declared
    /// total.
    pub(crate) fn start(
        index: u64,
        session: SessionId,
        frame: FrameNumber,
        first: FirstFragment,
        payload: &[u8],
        started_at: Instant,
    ) -> Self {
        let mut buffer = vec![0_u8; usize::from(first.total_len())];
        buffer[..payload.len()].copy_from_slice(payload);
        Self {
            index,
            session,
            frame,
            received: payload.len(),
            chunks: 1,
            payload: buffer,
            checksum: first.checksum(),
            started_at,
        }
    }

    /// Diagnostic sequence number assigned at admission.
    #[must_use]
    pub const fn index(&self) -> u64 { self.index }

    /// Session the transaction was opened in.
    #[must_use]
    pub const fn session(&self) -> SessionId { self.session }

    /// Frame number shared by the transaction's fragments.
    #[must_use]
    pub const fn frame(&self) -> FrameNumber { self.frame }

    /// Payload bytes received so far.
    #[must_use]
    pub const fn received(&self) -> usize { self.received }

    /// Fragments received so far, including fragment 0.
    #[must_use]
    pub const fn chunks(&self) -> usize { self.chunks }

    /// Declared transaction size.
    #[must_use]
    pub fn total_len(&self) -> usize { self.payload.len() }

    /// Declared checksum.
    #[must_use]
    pub const fn checksum(&self) -> u8 { self.checksum }

    /// Time the first fragment was admitted.
    #[must_use]
    pub const fn started_at(&self) -> Instant { self.started_at }

    /// Whether every declared byte has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.received == self.payload.len() }

    /// Index the next continuation fragment must carry, or `None` once the
    /// index space is exhausted.
    #[must_use]
    pub fn next_fragment(&self) -> Option<FragmentIndex> {
        u8::try_from(self.chunks).ok().map(FragmentIndex::new)
    }

    /// Borrow the reassembly buffer.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Copy `bytes` into the buffer at `offset` and count the fragment.
    ///
    /// The caller checks `offset + bytes.len()` against the declared total.
    pub(crate) fn write_fragment(&mut self, offset: usize, bytes: &[u8]) {
        self.payload[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.received += bytes.len();
        self.chunks += 1;
    }

    fn belongs_to(&self, session: SessionId, frame: FrameNumber) -> bool {
        self.session == session && self.frame == frame
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.started_at) >= ttl
    }
}

/// Fixed set of reassembly slots with lazy TTL eviction.
#[derive(Debug)]
pub struct SlotPool {
    slots: Box<[Option<Transaction>]>,
    ttl: Duration,
}

impl SlotPool {
    /// Allocate `capacity` empty slots.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None)
                .take(capacity.get())
                .collect(),
            ttl,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Number of slots holding a transaction.
    #[must_use]
    pub fn occupied(&self) -> usize { self.slots.iter().flatten().count() }

    /// Frame numbers of the buffered transactions, in slot order.
    #[must_use]
    pub fn frames(&self) -> Vec<FrameNumber> {
        self.slots.iter().flatten().map(Transaction::frame).collect()
    }

    /// Evict every transaction whose age has reached the TTL.
    ///
    /// Returns the frame numbers of the evicted transactions.
    pub fn purge_expired_at(&mut self, now: Instant) -> Vec<FrameNumber> {
        let ttl = self.ttl;
        let mut evicted = Vec::new();
        for slot in &mut *self.slots {
            if slot.as_ref().is_some_and(|tx| tx.is_expired(now, ttl)) {
                if let Some(tx) = slot.take() {
                    warn!(
                        frame = %tx.frame,
                        index = tx.index,
                        received = tx.received,
                        total = tx.total_len(),
                        "evicted expired transaction"
                    );
                    metrics::inc_evicted();
                    evicted.push(tx.frame);
                }
            }
        }
        if !evicted.is_empty() {
            metrics::set_slots_in_use(self.occupied());
        }
        evicted
    }

    /// Report whether a live transaction of `session` holds `frame`,
    /// sweeping expired slots first.
    pub fn contains_at(&mut self, session: SessionId, frame: FrameNumber, now: Instant) -> bool {
        self.purge_expired_at(now);
        self.get_mut(session, frame).is_some()
    }

    /// Borrow the transaction of `session` holding `frame`.
    ///
    /// Only occupied slots are considered; an empty slot never matches.
    pub fn get_mut(&mut self, session: SessionId, frame: FrameNumber) -> Option<&mut Transaction> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|tx| tx.belongs_to(session, frame))
    }

    /// Drop a transaction holding `frame` that was opened in a session other
    /// than `session`, returning it.
    ///
    /// Such a slot can never complete: its continuations are addressed to a
    /// session the receiver no longer accepts.
    pub fn evict_stale(&mut self, session: SessionId, frame: FrameNumber) -> Option<Transaction> {
        let tx = self
            .slots
            .iter_mut()
            .find(|slot| {
                slot.as_ref()
                    .is_some_and(|tx| tx.frame == frame && tx.session != session)
            })?
            .take()?;
        warn!(
            frame = %tx.frame,
            session = %tx.session,
            index = tx.index,
            "dropped transaction from previous session"
        );
        metrics::inc_evicted();
        metrics::set_slots_in_use(self.occupied());
        Some(tx)
    }

    /// Place `tx` in the first free slot, sweeping expired slots first.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::PoolExhausted`] when every slot holds a
    /// live transaction. The rejected transaction is dropped and the
    /// existing slots are left untouched.
    pub fn admit_at(&mut self, tx: Transaction, now: Instant) -> Result<(), ReassemblyError> {
        self.purge_expired_at(now);
        debug_assert!(
            self.get_mut(tx.session, tx.frame).is_none(),
            "frame {} already buffered",
            tx.frame
        );
        let capacity = self.capacity();
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_none()) else {
            warn!(frame = %tx.frame, capacity, "slot pool exhausted, dropping transaction");
            return Err(ReassemblyError::PoolExhausted { capacity });
        };
        *slot = Some(tx);
        metrics::set_slots_in_use(self.occupied());
        Ok(())
    }

    /// Remove and return the transaction of `session` holding `frame`.
    pub fn take(&mut self, session: SessionId, frame: FrameNumber) -> Option<Transaction> {
        let tx = self
            .slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|tx| tx.belongs_to(session, frame)))?
            .take();
        metrics::set_slots_in_use(self.occupied());
        tx
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    const TTL: Duration = Duration::from_millis(1000);
    const SESSION: SessionId = SessionId::new(1);

    #[fixture]
    fn pool() -> SlotPool { SlotPool::new(NonZeroUsize::new(2).expect("non-zero"), TTL) }

    fn tx(frame: u8, started_at: Instant) -> Transaction { tx_in(SESSION, frame, started_at) }

    fn tx_in(session: SessionId, frame: u8, started_at: Instant) -> Transaction {
        Transaction::start(
            u64::from(frame),
            session,
            FrameNumber::new(frame),
            FirstFragment::new(8, 0),
            &[1, 2, 3, 4],
            started_at,
        )
    }

    #[test]
    fn transaction_buffer_matches_declared_total() {
        let tx = tx(1, Instant::now());
        assert_eq!(tx.total_len(), 8);
        assert_eq!(tx.payload(), &[1, 2, 3, 4, 0, 0, 0, 0]);
        assert_eq!(tx.received(), 4);
        assert_eq!(tx.next_fragment(), Some(FragmentIndex::new(1)));
        assert!(!tx.is_complete());
    }

    #[rstest]
    fn admits_until_full(mut pool: SlotPool) {
        let now = Instant::now();
        pool.admit_at(tx(1, now), now).expect("first slot");
        pool.admit_at(tx(2, now), now).expect("second slot");
        assert_eq!(
            pool.admit_at(tx(3, now), now),
            Err(ReassemblyError::PoolExhausted { capacity: 2 })
        );
        assert_eq!(pool.frames(), vec![FrameNumber::new(1), FrameNumber::new(2)]);
    }

    #[rstest]
    fn lookup_requires_matching_frame(mut pool: SlotPool) {
        let now = Instant::now();
        pool.admit_at(tx(4, now), now).expect("admit");
        assert!(pool.contains_at(SESSION, FrameNumber::new(4), now));
        assert!(!pool.contains_at(SESSION, FrameNumber::new(5), now));
        assert!(pool.get_mut(SESSION, FrameNumber::new(5)).is_none());
    }

    #[rstest]
    fn lookup_requires_matching_session(mut pool: SlotPool) {
        let now = Instant::now();
        let other = SessionId::new(2);
        pool.admit_at(tx(4, now), now).expect("admit");
        assert!(!pool.contains_at(other, FrameNumber::new(4), now));
        assert!(pool.get_mut(other, FrameNumber::new(4)).is_none());
        assert!(pool.take(other, FrameNumber::new(4)).is_none());
        assert_eq!(pool.occupied(), 1);
    }

    #[rstest]
    fn stale_session_slot_is_evicted(mut pool: SlotPool) {
        let now = Instant::now();
        let next = SessionId::new(2);
        pool.admit_at(tx(4, now), now).expect("admit");
        pool.admit_at(tx(5, now), now).expect("admit");

        assert!(pool.evict_stale(SESSION, FrameNumber::new(4)).is_none());
        let stale = pool.evict_stale(next, FrameNumber::new(4)).expect("stale slot");
        assert_eq!(stale.session(), SESSION);
        assert_eq!(pool.frames(), vec![FrameNumber::new(5)]);

        pool.admit_at(tx_in(next, 4, now), now).expect("freed slot is reused");
        assert!(pool.contains_at(next, FrameNumber::new(4), now));
    }

    #[rstest]
    fn expired_slot_is_reused(mut pool: SlotPool) {
        let start = Instant::now();
        pool.admit_at(tx(1, start), start).expect("admit");
        pool.admit_at(tx(2, start + Duration::from_millis(500)), start)
            .expect("admit");

        let later = start + TTL;
        pool.admit_at(tx(3, later), later)
            .expect("expired slot should be reclaimed");
        assert_eq!(pool.frames(), vec![FrameNumber::new(3), FrameNumber::new(2)]);
    }

    #[rstest]
    fn purge_reports_evicted_frames(mut pool: SlotPool) {
        let start = Instant::now();
        pool.admit_at(tx(9, start), start).expect("admit");
        assert!(pool.purge_expired_at(start + TTL - Duration::from_millis(1)).is_empty());
        assert_eq!(pool.purge_expired_at(start + TTL), vec![FrameNumber::new(9)]);
        assert_eq!(pool.occupied(), 0);
    }

    #[rstest]
    fn take_frees_the_slot(mut pool: SlotPool) {
        let now = Instant::now();
        pool.admit_at(tx(6, now), now).expect("admit");
        let taken = pool.take(SESSION, FrameNumber::new(6)).expect("buffered transaction");
        assert_eq!(taken.frame(), FrameNumber::new(6));
        assert_eq!(pool.occupied(), 0);
        assert!(pool.take(SESSION, FrameNumber::new(6)).is_none());
    }
}
