//! Admission policy for decoded frames.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. the session must not be the reserved zero session;
//! 2. the session must match the receiver's current session;
//! 3. the node id must match the receiver's node id;
//! 4. the frame must travel downstream;
//! 5. stream frames must not fall behind the last-seen downstream frame,
//!    unless they belong to a transaction that is still buffered.
//!
//! Header decoding failures are reported before any of these run.
//! Frame numbers are compared with serial-number arithmetic (see
//! [`FrameNumber::is_behind`]), so the counter wrapping from 255 to a small
//! value reads as progress rather than as a stale frame.

use crate::{
    error::ReceiveError,
    header::{Direction, FrameHeader, FrameNumber, NodeId, SessionId},
};

/// Check the addressing fields of `header` against the receiver identity.
///
/// # Errors
///
/// Returns [`ReceiveError::ZeroSession`], [`ReceiveError::InvalidSession`],
/// [`ReceiveError::IncorrectNode`] or [`ReceiveError::Upstream`], in that
/// order of precedence.
pub fn check_addressing(
    header: &FrameHeader,
    session: SessionId,
    node: NodeId,
) -> Result<(), ReceiveError> {
    if header.session_id().is_unassigned() {
        return Err(ReceiveError::ZeroSession);
    }
    if header.session_id() != session {
        return Err(ReceiveError::InvalidSession {
            expected: session,
            found: header.session_id(),
        });
    }
    if header.node_id() != node {
        return Err(ReceiveError::IncorrectNode {
            expected: node,
            found: header.node_id(),
        });
    }
    if header.direction() != Direction::Downstream {
        return Err(ReceiveError::Upstream);
    }
    Ok(())
}

/// Tracks the last-seen downstream frame number for the current session.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderGuard {
    last_downstream: Option<FrameNumber>,
}

impl OrderGuard {
    /// Create a guard that has not seen any frame yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_downstream: None,
        }
    }

    /// Last-seen downstream frame number, if any frame was accepted since
    /// construction or the last reset.
    #[must_use]
    pub const fn last_downstream(&self) -> Option<FrameNumber> { self.last_downstream }

    /// Forget the last-seen frame, accepting any frame number next.
    pub fn reset(&mut self) { self.last_downstream = None; }

    /// Reject `frame` if it is behind the last-seen frame and not part of a
    /// buffered transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiveError::BadFrameOrder`] for stale frames.
    pub fn check(&self, frame: FrameNumber, buffered: bool) -> Result<(), ReceiveError> {
        match self.last_downstream {
            Some(last) if !buffered && frame.is_behind(last) => {
                Err(ReceiveError::BadFrameOrder { frame, last })
            }
            _ => Ok(()),
        }
    }

    /// Record an accepted frame, advancing the last-seen number when `frame`
    /// is ahead of it.
    pub fn observe(&mut self, frame: FrameNumber) {
        match self.last_downstream {
            Some(last) if !frame.is_ahead(last) => {}
            _ => self.last_downstream = Some(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::header::{FragmentIndex, FrameKind};

    fn header(direction: Direction, node: u8, session: u8) -> FrameHeader {
        FrameHeader::new(
            direction,
            FrameKind::Stream,
            NodeId::new(node),
            SessionId::new(session),
            FrameNumber::new(1),
            FragmentIndex::zero(),
        )
    }

    #[rstest]
    #[case::accepted(header(Direction::Downstream, 7, 3), Ok(()))]
    #[case::zero_session_wins(header(Direction::Upstream, 9, 0), Err(ReceiveError::ZeroSession))]
    #[case::session(
        header(Direction::Upstream, 9, 4),
        Err(ReceiveError::InvalidSession { expected: SessionId::new(3), found: SessionId::new(4) })
    )]
    #[case::node(
        header(Direction::Upstream, 9, 3),
        Err(ReceiveError::IncorrectNode { expected: NodeId::new(7), found: NodeId::new(9) })
    )]
    #[case::direction(header(Direction::Upstream, 7, 3), Err(ReceiveError::Upstream))]
    fn addressing_checks_run_in_order(
        #[case] header: FrameHeader,
        #[case] expected: Result<(), ReceiveError>,
    ) {
        assert_eq!(
            check_addressing(&header, SessionId::new(3), NodeId::new(7)),
            expected
        );
    }

    #[test]
    fn fresh_guard_accepts_any_frame() {
        let guard = OrderGuard::new();
        assert!(guard.check(FrameNumber::new(200), false).is_ok());
    }

    #[rstest]
    #[case::stale(10, 5, false, false)]
    #[case::stale_but_buffered(10, 5, true, true)]
    #[case::same(10, 10, false, true)]
    #[case::wrap(254, 0, false, true)]
    fn ordering(#[case] last: u8, #[case] frame: u8, #[case] buffered: bool, #[case] ok: bool) {
        let mut guard = OrderGuard::new();
        guard.observe(FrameNumber::new(last));
        assert_eq!(guard.check(FrameNumber::new(frame), buffered).is_ok(), ok);
    }

    #[test]
    fn observe_only_moves_forward() {
        let mut guard = OrderGuard::new();
        guard.observe(FrameNumber::new(20));
        guard.observe(FrameNumber::new(15));
        assert_eq!(guard.last_downstream(), Some(FrameNumber::new(20)));
        guard.observe(FrameNumber::new(2));
        assert_eq!(guard.last_downstream(), Some(FrameNumber::new(20)));
        guard.observe(FrameNumber::new(250));
        assert_eq!(guard.last_downstream(), Some(FrameNumber::new(20)));
        guard.observe(FrameNumber::new(21));
        assert_eq!(guard.last_downstream(), Some(FrameNumber::new(21)));
    }

    #[test]
    fn observe_follows_wraparound() {
        let mut guard = OrderGuard::new();
        guard.observe(FrameNumber::new(254));
        guard.observe(FrameNumber::new(1));
        assert_eq!(guard.last_downstream(), Some(FrameNumber::new(1)));
        assert!(guard.check(FrameNumber::new(254), false).is_err());
    }

    #[test]
    fn reset_forgets_last_frame() {
        let mut guard = OrderGuard::new();
        guard.observe(FrameNumber::new(90));
        guard.reset();
        assert_eq!(guard.last_downstream(), None);
        assert!(guard.check(FrameNumber::new(3), false).is_ok());
    }
}
