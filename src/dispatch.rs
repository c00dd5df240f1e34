//! Hand-off of completed transactions to the application.
//!
//! The [`Dispatcher`] owns at most one [`DeliveryHandler`]. Each completed
//! transaction is offered exactly once: it is checksummed, checked against
//! the last submitted frame number, passed to the handler as a borrowed
//! slice and then dropped, releasing its buffer whatever the outcome.

use tracing::{debug, warn};

use crate::{
    checksum::{ChecksumPolicy, xor_checksum},
    error::DispatchError,
    header::FrameNumber,
    metrics,
    pool::Transaction,
};

/// Receives reassembled transaction payloads.
///
/// The payload slice is only valid for the duration of the call. Any
/// `FnMut(&[u8])` closure is a handler.
pub trait DeliveryHandler {
    /// Consume one complete transaction payload.
    fn deliver(&mut self, payload: &[u8]);
}

impl<F> DeliveryHandler for F
where
    F: FnMut(&[u8]),
{
    fn deliver(&mut self, payload: &[u8]) { self(payload); }
}

/// Summary of a delivered transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    index: u64,
    frame: FrameNumber,
    len: usize,
    checksum_matched: bool,
}

impl Delivery {
    /// Diagnostic transaction index.
    #[must_use]
    pub const fn index(&self) -> u64 { self.index }

    /// Frame number of the transaction.
    #[must_use]
    pub const fn frame(&self) -> FrameNumber { self.frame }

    /// Payload length handed to the handler.
    #[must_use]
    pub const fn len(&self) -> usize { self.len }

    /// Whether an empty payload was delivered.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    /// Whether the payload matched its declared checksum. Always `true`
    /// under [`ChecksumPolicy::Strict`].
    #[must_use]
    pub const fn checksum_matched(&self) -> bool { self.checksum_matched }
}

/// Submits completed transactions to the registered handler.
pub struct Dispatcher {
    handler: Option<Box<dyn DeliveryHandler>>,
    last_submitted: Option<FrameNumber>,
    policy: ChecksumPolicy,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_handler", &self.handler.is_some())
            .field("last_submitted", &self.last_submitted)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with no handler.
    #[must_use]
    pub fn new(policy: ChecksumPolicy) -> Self {
        Self {
            handler: None,
            last_submitted: None,
            policy,
        }
    }

    /// Register `handler`, replacing any previous one.
    pub fn set_handler<H>(&mut self, handler: H)
    where
        H: DeliveryHandler + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    /// Remove the registered handler.
    pub fn clear_handler(&mut self) { self.handler = None; }

    /// Whether a handler is registered.
    #[must_use]
    pub fn has_handler(&self) -> bool { self.handler.is_some() }

    /// Checksum mismatch policy.
    #[must_use]
    pub const fn policy(&self) -> ChecksumPolicy { self.policy }

    /// Change the checksum mismatch policy.
    pub fn set_policy(&mut self, policy: ChecksumPolicy) { self.policy = policy; }

    /// Frame number of the last successful submission.
    #[must_use]
    pub const fn last_submitted(&self) -> Option<FrameNumber> { self.last_submitted }

    /// Forget the last submitted frame.
    pub fn reset(&mut self) { self.last_submitted = None; }

    /// Offer a completed transaction to the handler.
    ///
    /// The frame number must be strictly greater than the last submitted one
    /// unless it is 0, which restarts the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoHandler`] without a handler,
    /// [`DispatchError::StaleFrame`] for a frame that does not advance, and
    /// [`DispatchError::ChecksumMismatch`] under [`ChecksumPolicy::Strict`].
    /// The transaction is dropped in every case.
    pub fn submit(&mut self, tx: Transaction) -> Result<Delivery, DispatchError> {
        let frame = tx.frame();
        let Some(handler) = self.handler.as_mut() else {
            warn!(%frame, "no delivery handler registered, dropping transaction");
            return Err(DispatchError::NoHandler { frame });
        };

        if let Some(last) = self.last_submitted
            && frame.get() != 0
            && frame <= last
        {
            warn!(%frame, %last, "dropping out-of-order submission");
            return Err(DispatchError::StaleFrame { frame, last });
        }

        let actual = xor_checksum(tx.payload());
        let checksum_matched = actual == tx.checksum();
        if !self.policy.allows(checksum_matched) {
            warn!(
                %frame,
                expected = tx.checksum(),
                actual,
                "checksum mismatch, dropping transaction"
            );
            return Err(DispatchError::ChecksumMismatch {
                frame,
                expected: tx.checksum(),
                actual,
            });
        }
        if !checksum_matched {
            warn!(%frame, "checksum mismatch, delivering anyway");
        }

        handler.deliver(tx.payload());
        self.last_submitted = Some(frame);
        metrics::inc_delivered();
        debug!(%frame, index = tx.index(), len = tx.total_len(), "delivered transaction");

        Ok(Delivery {
            index: tx.index(),
            frame,
            len: tx.total_len(),
            checksum_matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Instant};

    use rstest::rstest;

    use super::*;
    use crate::{header::SessionId, message::FirstFragment};

    type Log = Rc<RefCell<Vec<Vec<u8>>>>;

    fn recording(policy: ChecksumPolicy) -> (Dispatcher, Log) {
        let log = Log::default();
        let sink = Rc::clone(&log);
        let mut dispatcher = Dispatcher::new(policy);
        dispatcher.set_handler(move |payload: &[u8]| sink.borrow_mut().push(payload.to_vec()));
        (dispatcher, log)
    }

    fn complete(frame: u8, payload: &[u8], checksum: u8) -> Transaction {
        let total = u16::try_from(payload.len()).expect("test payload fits u16");
        Transaction::start(
            0,
            SessionId::new(1),
            FrameNumber::new(frame),
            FirstFragment::new(total, checksum),
            payload,
            Instant::now(),
        )
    }

    #[test]
    fn delivers_matching_transaction() {
        let (mut dispatcher, log) = recording(ChecksumPolicy::Strict);
        let delivery = dispatcher
            .submit(complete(1, &[1, 2, 4], 7))
            .expect("delivered");
        assert_eq!(delivery.len(), 3);
        assert!(delivery.checksum_matched());
        assert_eq!(*log.borrow(), vec![vec![1, 2, 4]]);
        assert_eq!(dispatcher.last_submitted(), Some(FrameNumber::new(1)));
    }

    #[test]
    fn fails_without_handler() {
        let mut dispatcher = Dispatcher::new(ChecksumPolicy::Strict);
        assert_eq!(
            dispatcher.submit(complete(1, &[1], 1)),
            Err(DispatchError::NoHandler {
                frame: FrameNumber::new(1)
            })
        );
        assert_eq!(dispatcher.last_submitted(), None);
    }

    #[rstest]
    #[case::strict(ChecksumPolicy::Strict, false)]
    #[case::permissive(ChecksumPolicy::Permissive, true)]
    fn mismatch_follows_policy(#[case] policy: ChecksumPolicy, #[case] delivered: bool) {
        let (mut dispatcher, log) = recording(policy);
        let result = dispatcher.submit(complete(2, &[1, 2], 0xFF));
        assert_eq!(result.is_ok(), delivered);
        assert_eq!(log.borrow().len(), usize::from(delivered));
        if let Ok(delivery) = result {
            assert!(!delivery.checksum_matched());
        }
    }

    #[rstest]
    #[case::older(5, 4, false)]
    #[case::equal(5, 5, false)]
    #[case::newer(5, 6, true)]
    #[case::zero_restarts(5, 0, true)]
    fn submission_order(#[case] last: u8, #[case] next: u8, #[case] accepted: bool) {
        let (mut dispatcher, log) = recording(ChecksumPolicy::Strict);
        dispatcher.submit(complete(last, &[9], 9)).expect("first submission");
        let result = dispatcher.submit(complete(next, &[9], 9));
        assert_eq!(result.is_ok(), accepted);
        assert_eq!(log.borrow().len(), if accepted { 2 } else { 1 });
    }

    #[test]
    fn reset_accepts_any_frame() {
        let (mut dispatcher, _log) = recording(ChecksumPolicy::Strict);
        dispatcher.submit(complete(200, &[1], 1)).expect("first");
        dispatcher.reset();
        assert!(dispatcher.submit(complete(3, &[1], 1)).is_ok());
    }
}
