use std::{cell::RefCell, rc::Rc};

use lstream::DeliveryHandler;

/// Delivery handler that stores every payload it receives.
///
/// Clones share the same log, so one clone can be installed in a receiver
/// while the test keeps another for assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    payloads: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl RecordingHandler {
    /// Payloads delivered so far, oldest first.
    #[must_use]
    pub fn payloads(&self) -> Vec<Vec<u8>> { self.payloads.borrow().clone() }

    /// Number of deliveries so far.
    #[must_use]
    pub fn count(&self) -> usize { self.payloads.borrow().len() }

    /// Most recent payload, if any.
    #[must_use]
    pub fn last(&self) -> Option<Vec<u8>> { self.payloads.borrow().last().cloned() }
}

impl DeliveryHandler for RecordingHandler {
    fn deliver(&mut self, payload: &[u8]) { self.payloads.borrow_mut().push(payload.to_vec()); }
}
