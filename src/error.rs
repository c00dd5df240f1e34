//! Error and status types emitted by the receiver.
//!
//! Each processing stage has its own error enum so tests can assert the
//! precise reason a frame was turned away. [`ReceiveError`] wraps them all
//! and maps every failure onto the compact [`ReceiveStatus`] code reported to
//! link-level callers.

use thiserror::Error;

use crate::header::{FragmentIndex, FrameNumber, NodeId, SessionId};

/// Numeric outcome of a `receive` call, matching the on-device status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReceiveStatus {
    /// The frame was accepted.
    NoFailure = 0,
    /// The frame carried the reserved zero session.
    ZeroSession = 1,
    /// Unsupported version or a frame too short to hold its header.
    BadHeader = 2,
    /// The frame belongs to another session.
    InvalidSession = 3,
    /// The frame is addressed to another node.
    IncorrectNode = 4,
    /// The frame number is stale or out of order.
    BadFrameOrder = 5,
    /// The frame body could not be decompressed.
    CompressionFailure = 6,
    /// Any other local failure: direction, pool exhaustion, reassembly or
    /// submission problems.
    OtherFailure = 7,
}

impl ReceiveStatus {
    /// Return the single-byte status code.
    #[must_use]
    pub const fn code(self) -> u8 { self as u8 }

    /// Collapse a `receive` result into its status code.
    #[must_use]
    pub fn from_result<T>(result: &Result<T, ReceiveError>) -> Self {
        match result {
            Ok(_) => Self::NoFailure,
            Err(err) => err.status(),
        }
    }
}

impl TryFrom<u8> for ReceiveStatus {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::NoFailure,
            1 => Self::ZeroSession,
            2 => Self::BadHeader,
            3 => Self::InvalidSession,
            4 => Self::IncorrectNode,
            5 => Self::BadFrameOrder,
            6 => Self::CompressionFailure,
            7 => Self::OtherFailure,
            other => return Err(other),
        })
    }
}

/// Errors raised while decoding the fixed header.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// Fewer bytes than a full header.
    #[error("truncated header: have {have} bytes, need {need}")]
    Truncated {
        /// Bytes available.
        have: usize,
        /// Bytes required.
        need: usize,
    },
    /// Version bits do not match the supported protocol version.
    #[error("unsupported protocol version {found}")]
    UnsupportedVersion {
        /// Version carried by the frame.
        found: u8,
    },
}

/// Errors raised by a [`Decompressor`](crate::compression::Decompressor).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecompressError {
    /// The input is not a valid compressed stream.
    #[error("corrupt compressed body: {reason}")]
    Corrupt {
        /// Codec-specific description.
        reason: String,
    },
    /// The decompressed output would exceed the configured bound.
    #[error("decompressed body exceeds {limit} bytes")]
    OutputTooLarge {
        /// Maximum decompressed size.
        limit: usize,
    },
}

/// Errors raised while extracting a [`Message`](crate::message::Message)
/// from a frame.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// A first fragment too short for its size and checksum prelude.
    #[error("truncated first fragment: have {have} body bytes, need {need}")]
    TruncatedPrelude {
        /// Body bytes available after the header.
        have: usize,
        /// Bytes required for the prelude.
        need: usize,
    },
    /// A compressed frame arrived while compression is disabled.
    #[error("compressed frame received with compression disabled")]
    CompressionDisabled,
    /// A compressed frame arrived but no decompressor is installed.
    #[error("compressed frame received without a decompressor")]
    MissingDecompressor,
    /// The decompressor rejected the body.
    #[error("decompression failed: {0}")]
    Decompress(#[from] DecompressError),
}

/// Errors raised while routing a fragment into the slot pool.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Every slot holds a live transaction.
    #[error("no free reassembly slot among {capacity}")]
    PoolExhausted {
        /// Configured pool capacity.
        capacity: usize,
    },
    /// A continuation fragment arrived for a frame with no buffered
    /// transaction.
    #[error("fragment {index} for frame {frame} has no buffered transaction")]
    UnknownTransaction {
        /// Frame number of the orphaned fragment.
        frame: FrameNumber,
        /// Fragment index carried by the frame.
        index: FragmentIndex,
    },
    /// A continuation fragment skipped ahead of the next expected index.
    #[error("frame {frame}: expected fragment {expected}, found {found}")]
    FragmentIndexMismatch {
        /// Frame number of the transaction.
        frame: FrameNumber,
        /// Next fragment index the slot expects.
        expected: FragmentIndex,
        /// Index carried by the frame.
        found: FragmentIndex,
    },
    /// A fragment would write past the declared transaction size.
    #[error("frame {frame}: fragment of {len} bytes at offset {offset} overruns {total} bytes")]
    FragmentOutOfBounds {
        /// Frame number of the transaction.
        frame: FrameNumber,
        /// Offset the fragment would be written at.
        offset: usize,
        /// Fragment payload length.
        len: usize,
        /// Declared transaction size.
        total: usize,
    },
    /// A non-final fragment did not carry exactly the fragment payload cap.
    #[error("frame {frame}: non-final fragment carries {len} bytes, expected {cap}")]
    IrregularFragment {
        /// Frame number of the transaction.
        frame: FrameNumber,
        /// Payload bytes carried.
        len: usize,
        /// Required payload size for non-final fragments.
        cap: usize,
    },
    /// The declared size needs more fragments than the index can address.
    #[error("frame {frame}: declared size {declared} exceeds {limit} byte reassembly limit")]
    TransactionTooLarge {
        /// Frame number of the transaction.
        frame: FrameNumber,
        /// Declared total size.
        declared: usize,
        /// Largest size reachable with 256 full fragments.
        limit: usize,
    },
}

/// Errors raised while handing a completed transaction to the application.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No delivery handler is registered.
    #[error("no delivery handler registered for frame {frame}")]
    NoHandler {
        /// Frame number of the dropped transaction.
        frame: FrameNumber,
    },
    /// The frame number does not advance past the last submission.
    #[error("frame {frame} does not follow last submitted frame {last}")]
    StaleFrame {
        /// Frame number of the dropped transaction.
        frame: FrameNumber,
        /// Last successfully submitted frame number.
        last: FrameNumber,
    },
    /// The payload checksum differs from the declared value.
    #[error("frame {frame}: checksum {actual:#04x} does not match declared {expected:#04x}")]
    ChecksumMismatch {
        /// Frame number of the dropped transaction.
        frame: FrameNumber,
        /// Declared checksum.
        expected: u8,
        /// Checksum computed over the payload.
        actual: u8,
    },
}

/// Reason a frame was rejected by the receiver.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReceiveError {
    /// The header could not be decoded.
    #[error("bad header: {0}")]
    Header(#[from] HeaderError),
    /// The frame carried the reserved zero session.
    #[error("frame carries the reserved zero session")]
    ZeroSession,
    /// The frame belongs to another session.
    #[error("session {found} does not match current session {expected}")]
    InvalidSession {
        /// Current session.
        expected: SessionId,
        /// Session carried by the frame.
        found: SessionId,
    },
    /// The frame is addressed to another node.
    #[error("frame addressed to node {found}, this node is {expected}")]
    IncorrectNode {
        /// This receiver's node id.
        expected: NodeId,
        /// Node id carried by the frame.
        found: NodeId,
    },
    /// The frame travels upstream; receivers only accept downstream frames.
    #[error("upstream frame rejected by receiver")]
    Upstream,
    /// The frame number is behind the last-seen downstream frame.
    #[error("frame {frame} is behind last-seen frame {last}")]
    BadFrameOrder {
        /// Frame number carried by the frame.
        frame: FrameNumber,
        /// Last-seen downstream frame number.
        last: FrameNumber,
    },
    /// The body could not be turned into a message.
    #[error(transparent)]
    Message(#[from] MessageError),
    /// Reassembly refused the fragment.
    #[error(transparent)]
    Reassembly(#[from] ReassemblyError),
    /// Submission of a completed transaction failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ReceiveError {
    /// Map the error onto its link-level status code.
    #[must_use]
    pub const fn status(&self) -> ReceiveStatus {
        match self {
            Self::Header(_) | Self::Message(MessageError::TruncatedPrelude { .. }) => {
                ReceiveStatus::BadHeader
            }
            Self::ZeroSession => ReceiveStatus::ZeroSession,
            Self::InvalidSession { .. } => ReceiveStatus::InvalidSession,
            Self::IncorrectNode { .. } => ReceiveStatus::IncorrectNode,
            Self::BadFrameOrder { .. } => ReceiveStatus::BadFrameOrder,
            Self::Message(_) => ReceiveStatus::CompressionFailure,
            Self::Upstream | Self::Reassembly(_) | Self::Dispatch(_) => ReceiveStatus::OtherFailure,
        }
    }
}
