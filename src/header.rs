//! Fixed five-byte frame header.
//!
//! ```text
//! byte 0: [version:3][downstream:1][compressed:1][kind:3]
//! byte 1: node id
//! byte 2: session id (0 reserved)
//! byte 3: frame number (wraps)
//! byte 4: fragment index (0 = first fragment)
//! ```
//!
//! Decoding only checks the protocol version. Node, session and direction
//! are policy and are enforced by the caller.

mod ids;

pub use ids::{FragmentIndex, FrameNumber, NodeId, SessionId};

use crate::error::HeaderError;

/// Protocol version carried in the top three bits of byte 0.
pub const PROTOCOL_VERSION: u8 = 0;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 5;

const VERSION_SHIFT: u8 = 5;
const DOWNSTREAM_FLAG: u8 = 0b0001_0000;
const COMPRESSED_FLAG: u8 = 0b0000_1000;
const KIND_MASK: u8 = 0b0000_0111;

/// Frame kind from the low three bits of byte 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Acknowledgment. Reserved; receivers ignore it.
    Ack,
    /// Transaction data.
    Stream,
    /// Any other value in the three-bit field.
    Reserved(u8),
}

impl FrameKind {
    const fn from_bits(bits: u8) -> Self {
        match bits & KIND_MASK {
            0 => Self::Ack,
            1 => Self::Stream,
            other => Self::Reserved(other),
        }
    }

    const fn bits(self) -> u8 {
        match self {
            Self::Ack => 0,
            Self::Stream => 1,
            Self::Reserved(bits) => bits & KIND_MASK,
        }
    }
}

/// Travel direction relative to the receiving node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Node to controller.
    Upstream,
    /// Controller to node; the only direction a receiver accepts.
    Downstream,
}

/// Decoded frame header.
///
/// A `FrameHeader` only exists for input that carried the supported protocol
/// version; there is no partially valid header.
///
/// # Examples
///
/// ```
/// use lstream::{Direction, FrameHeader, FrameKind};
///
/// let header = FrameHeader::parse(&[0b0001_0001, 7, 3, 42, 0]).expect("valid header");
/// assert_eq!(header.direction(), Direction::Downstream);
/// assert_eq!(header.kind(), FrameKind::Stream);
/// assert_eq!(header.node_id().get(), 7);
/// assert_eq!(header.session_id().get(), 3);
/// assert_eq!(header.frame_number().get(), 42);
/// assert!(header.fragment_index().is_first());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    direction: Direction,
    compressed: bool,
    kind: FrameKind,
    node_id: NodeId,
    session_id: SessionId,
    frame_number: FrameNumber,
    fragment_index: FragmentIndex,
}

impl FrameHeader {
    /// Create a header from its semantic fields.
    #[must_use]
    pub const fn new(
        direction: Direction,
        kind: FrameKind,
        node_id: NodeId,
        session_id: SessionId,
        frame_number: FrameNumber,
        fragment_index: FragmentIndex,
    ) -> Self {
        Self {
            direction,
            compressed: false,
            kind,
            node_id,
            session_id,
            frame_number,
            fragment_index,
        }
    }

    /// Return a copy with the compressed flag set to `compressed`.
    #[must_use]
    pub const fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Decode the header from the start of `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Truncated`] when fewer than [`HEADER_LEN`]
    /// bytes are available and [`HeaderError::UnsupportedVersion`] when the
    /// version bits differ from [`PROTOCOL_VERSION`].
    pub fn parse(frame: &[u8]) -> Result<Self, HeaderError> {
        let Some(&[control, node, session, frame_number, fragment]) =
            frame.first_chunk::<HEADER_LEN>()
        else {
            return Err(HeaderError::Truncated {
                have: frame.len(),
                need: HEADER_LEN,
            });
        };

        let version = control >> VERSION_SHIFT;
        if version != PROTOCOL_VERSION {
            return Err(HeaderError::UnsupportedVersion { found: version });
        }

        let direction = if control & DOWNSTREAM_FLAG == 0 {
            Direction::Upstream
        } else {
            Direction::Downstream
        };

        Ok(Self {
            direction,
            compressed: control & COMPRESSED_FLAG != 0,
            kind: FrameKind::from_bits(control),
            node_id: NodeId::new(node),
            session_id: SessionId::new(session),
            frame_number: FrameNumber::new(frame_number),
            fragment_index: FragmentIndex::new(fragment),
        })
    }

    /// Encode the header into its five wire bytes.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut control = (PROTOCOL_VERSION << VERSION_SHIFT) | self.kind.bits();
        if matches!(self.direction, Direction::Downstream) {
            control |= DOWNSTREAM_FLAG;
        }
        if self.compressed {
            control |= COMPRESSED_FLAG;
        }
        [
            control,
            self.node_id.get(),
            self.session_id.get(),
            self.frame_number.get(),
            self.fragment_index.get(),
        ]
    }

    /// Travel direction of the frame.
    #[must_use]
    pub const fn direction(&self) -> Direction { self.direction }

    /// Whether the body after the header is compressed.
    #[must_use]
    pub const fn is_compressed(&self) -> bool { self.compressed }

    /// Frame kind.
    #[must_use]
    pub const fn kind(&self) -> FrameKind { self.kind }

    /// Addressed node.
    #[must_use]
    pub const fn node_id(&self) -> NodeId { self.node_id }

    /// Session the frame belongs to.
    #[must_use]
    pub const fn session_id(&self) -> SessionId { self.session_id }

    /// Frame sequence number shared by every fragment of a transaction.
    #[must_use]
    pub const fn frame_number(&self) -> FrameNumber { self.frame_number }

    /// Fragment position within the transaction.
    #[must_use]
    pub const fn fragment_index(&self) -> FragmentIndex { self.fragment_index }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_every_field() {
        let header = FrameHeader::parse(&[0b0001_1001, 9, 4, 200, 3, 0xFF]).expect("header");
        assert_eq!(header.direction(), Direction::Downstream);
        assert!(header.is_compressed());
        assert_eq!(header.kind(), FrameKind::Stream);
        assert_eq!(header.node_id(), NodeId::new(9));
        assert_eq!(header.session_id(), SessionId::new(4));
        assert_eq!(header.frame_number(), FrameNumber::new(200));
        assert_eq!(header.fragment_index(), FragmentIndex::new(3));
    }

    #[rstest]
    #[case::ack(0b0000_0000, FrameKind::Ack, Direction::Upstream)]
    #[case::stream_upstream(0b0000_0001, FrameKind::Stream, Direction::Upstream)]
    #[case::reserved(0b0001_0110, FrameKind::Reserved(6), Direction::Downstream)]
    fn decodes_kind_and_direction(
        #[case] control: u8,
        #[case] kind: FrameKind,
        #[case] direction: Direction,
    ) {
        let header = FrameHeader::parse(&[control, 1, 1, 1, 0]).expect("header");
        assert_eq!(header.kind(), kind);
        assert_eq!(header.direction(), direction);
        assert!(!header.is_compressed());
    }

    #[rstest]
    #[case::version_one(0b0011_0001, 1)]
    #[case::version_seven(0b1111_0001, 7)]
    fn rejects_unsupported_version(#[case] control: u8, #[case] found: u8) {
        assert_eq!(
            FrameHeader::parse(&[control, 1, 1, 1, 0]),
            Err(HeaderError::UnsupportedVersion { found })
        );
    }

    #[test]
    fn rejects_short_input() {
        assert_eq!(
            FrameHeader::parse(&[0b0001_0001, 1, 1]),
            Err(HeaderError::Truncated { have: 3, need: 5 })
        );
    }

    #[test]
    fn encodes_to_parseable_bytes() {
        let header = FrameHeader::new(
            Direction::Downstream,
            FrameKind::Stream,
            NodeId::new(7),
            SessionId::new(3),
            FrameNumber::new(12),
            FragmentIndex::new(2),
        )
        .with_compressed(true);
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0b0001_1001, 7, 3, 12, 2]);
        assert_eq!(FrameHeader::parse(&bytes), Ok(header));
    }
}
