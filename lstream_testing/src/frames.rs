//! Wire frame construction.

use lstream::{
    Direction,
    FragmentIndex,
    FrameHeader,
    FrameKind,
    FrameNumber,
    NodeId,
    SessionId,
    byte_order::write_wire_u16,
    checksum::xor_checksum,
};

const VERSION_SHIFT: u8 = 5;
const VERSION_MASK: u8 = 0b1110_0000;

/// Builder for raw frames, defaulting to a downstream, uncompressed stream
/// frame with frame number 0 and fragment index 0.
#[derive(Clone, Copy, Debug)]
pub struct FrameBuilder {
    version: u8,
    direction: Direction,
    kind: FrameKind,
    compressed: bool,
    node: u8,
    session: u8,
    frame: u8,
    fragment: u8,
}

impl FrameBuilder {
    /// Start a frame addressed to `node` in `session`.
    #[must_use]
    pub const fn new(node: u8, session: u8) -> Self {
        Self {
            version: 0,
            direction: Direction::Downstream,
            kind: FrameKind::Stream,
            compressed: false,
            node,
            session,
            frame: 0,
            fragment: 0,
        }
    }

    /// Override the three version bits.
    #[must_use]
    pub const fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Mark the frame as travelling upstream.
    #[must_use]
    pub const fn upstream(mut self) -> Self {
        self.direction = Direction::Upstream;
        self
    }

    /// Set the frame kind.
    #[must_use]
    pub const fn kind(mut self, kind: FrameKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the compressed flag.
    #[must_use]
    pub const fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Set the frame number.
    #[must_use]
    pub const fn frame(mut self, frame: u8) -> Self {
        self.frame = frame;
        self
    }

    /// Set the fragment index.
    #[must_use]
    pub const fn fragment(mut self, fragment: u8) -> Self {
        self.fragment = fragment;
        self
    }

    /// Encode the five header bytes.
    #[must_use]
    pub fn header(&self) -> [u8; 5] {
        let mut bytes = FrameHeader::new(
            self.direction,
            self.kind,
            NodeId::new(self.node),
            SessionId::new(self.session),
            FrameNumber::new(self.frame),
            FragmentIndex::new(self.fragment),
        )
        .with_compressed(self.compressed)
        .to_bytes();
        bytes[0] = (bytes[0] & !VERSION_MASK) | ((self.version << VERSION_SHIFT) & VERSION_MASK);
        bytes
    }

    /// Header followed by `body`, with no prelude.
    #[must_use]
    pub fn raw(&self, body: &[u8]) -> Vec<u8> {
        let mut bytes = self.header().to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    /// Fragment 0 declaring `total` bytes with `checksum`, carrying `payload`.
    #[must_use]
    pub fn first(&self, total: u16, checksum: u8, payload: &[u8]) -> Vec<u8> {
        let mut body = write_wire_u16(total).to_vec();
        body.push(checksum);
        body.extend_from_slice(payload);
        self.fragment(0).raw(&body)
    }

    /// Complete single-fragment transaction with a correct checksum.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is longer than `u16::MAX`.
    #[must_use]
    pub fn single(&self, payload: &[u8]) -> Vec<u8> {
        let total = u16::try_from(payload.len()).expect("payload length fits u16");
        self.first(total, xor_checksum(payload), payload)
    }

    /// Continuation fragment `index` carrying `payload`.
    #[must_use]
    pub fn continuation(&self, index: u8, payload: &[u8]) -> Vec<u8> {
        self.fragment(index).raw(payload)
    }
}

/// Split `payload` into the frames a conforming sender would emit: fragment
/// 0 with the prelude and up to `cap` bytes, then `cap`-sized continuations
/// with a shorter final one.
///
/// # Panics
///
/// Panics if `cap` is zero, the payload exceeds `u16::MAX` bytes, or more
/// than 256 fragments would be needed.
#[must_use]
pub fn fragment_transaction(builder: FrameBuilder, cap: usize, payload: &[u8]) -> Vec<Vec<u8>> {
    assert!(cap > 0, "fragment cap must be positive");
    let total = u16::try_from(payload.len()).expect("payload length fits u16");
    let split = cap.min(payload.len());
    let (head, tail) = payload.split_at(split);

    let mut frames = vec![builder.first(total, xor_checksum(payload), head)];
    for (position, chunk) in tail.chunks(cap).enumerate() {
        let index = u8::try_from(position + 1).expect("at most 256 fragments");
        frames.push(builder.continuation(index, chunk));
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_cap_boundaries() {
        let payload: Vec<u8> = (0..10).collect();
        let frames = fragment_transaction(FrameBuilder::new(1, 1).frame(4), 4, &payload);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].len(), 5 + 3 + 4);
        assert_eq!(frames[1][4], 1);
        assert_eq!(&frames[2][5..], &[8, 9]);
    }

    #[test]
    fn version_override_sets_top_bits() {
        let header = FrameBuilder::new(1, 1).version(1).header();
        assert_eq!(header[0] >> 5, 1);
        assert_eq!(header[0] & 0b0001_1111, 0b0001_0001);
    }
}
