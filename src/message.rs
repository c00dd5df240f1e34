//! Per-frame message extraction.
//!
//! A [`Message`] pairs a decoded [`FrameHeader`] with a view of the frame's
//! payload. First fragments additionally carry a three-byte prelude
//! declaring the transaction size (little-endian `u16`) and its checksum:
//!
//! ```text
//! fragment 0: [header:5][total_len:2 LE][checksum:1][payload..]
//! fragment n: [header:5][payload..]
//! ```
//!
//! When the compressed flag is set, everything after the header is expanded
//! first and the prelude is read from the expanded body. Messages live only
//! for the duration of one `receive` call and are never stored.

use std::borrow::Cow;

use crate::{
    byte_order::read_wire_u16,
    compression::Decompressor,
    error::MessageError,
    header::{FrameHeader, HEADER_LEN},
};

/// Length of the size and checksum prelude on first fragments.
pub const FIRST_FRAGMENT_PRELUDE_LEN: usize = 3;

/// Offset of the payload in an uncompressed first fragment.
pub const FIRST_FRAGMENT_PAYLOAD_OFFSET: usize = HEADER_LEN + FIRST_FRAGMENT_PRELUDE_LEN;

/// Transaction metadata declared by the first fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirstFragment {
    total_len: u16,
    checksum: u8,
}

impl FirstFragment {
    /// Create first-fragment metadata.
    #[must_use]
    pub const fn new(total_len: u16, checksum: u8) -> Self {
        Self {
            total_len,
            checksum,
        }
    }

    /// Declared size of the whole transaction payload.
    #[must_use]
    pub const fn total_len(&self) -> u16 { self.total_len }

    /// Declared checksum of the whole transaction payload.
    #[must_use]
    pub const fn checksum(&self) -> u8 { self.checksum }
}

/// How compressed bodies are handled while parsing.
#[derive(Clone, Copy)]
pub struct BodyDecoding<'d> {
    /// Whether compressed frames are accepted at all.
    pub enabled: bool,
    /// Codec used to expand compressed bodies.
    pub decompressor: Option<&'d dyn Decompressor>,
    /// Upper bound on the expanded body size.
    pub limit: usize,
}

impl BodyDecoding<'_> {
    /// Decoding settings that reject every compressed frame.
    #[must_use]
    pub const fn uncompressed() -> Self {
        Self {
            enabled: false,
            decompressor: None,
            limit: 0,
        }
    }
}

impl std::fmt::Debug for BodyDecoding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyDecoding")
            .field("enabled", &self.enabled)
            .field("has_decompressor", &self.decompressor.is_some())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Decoded view of a single inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    header: FrameHeader,
    payload: Cow<'a, [u8]>,
    first: Option<FirstFragment>,
}

impl<'a> Message<'a> {
    /// Extract the message carried by `frame`, whose header has already been
    /// decoded into `header`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lstream::{
    ///     FrameHeader,
    ///     message::{BodyDecoding, Message},
    /// };
    ///
    /// let frame = [0b0001_0001, 7, 3, 1, 0, 0x02, 0x00, 0x03, 0x01, 0x02];
    /// let header = FrameHeader::parse(&frame).expect("header");
    /// let message = Message::parse(header, &frame, BodyDecoding::uncompressed()).expect("message");
    /// let first = message.first_fragment().expect("fragment 0 carries a prelude");
    /// assert_eq!(first.total_len(), 2);
    /// assert_eq!(first.checksum(), 0x03);
    /// assert_eq!(message.payload(), &[0x01, 0x02]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::TruncatedPrelude`] when a first fragment is too
    /// short for its prelude, and the compression variants of
    /// [`MessageError`] when a compressed body cannot be expanded.
    pub fn parse(
        header: FrameHeader,
        frame: &'a [u8],
        decoding: BodyDecoding<'_>,
    ) -> Result<Self, MessageError> {
        let raw = frame.get(HEADER_LEN..).unwrap_or_default();
        let body = if header.is_compressed() && !raw.is_empty() {
            Cow::Owned(expand(raw, decoding)?)
        } else {
            Cow::Borrowed(raw)
        };

        if !header.fragment_index().is_first() {
            return Ok(Self {
                header,
                payload: body,
                first: None,
            });
        }

        let Some(&[low, high, checksum]) = body.first_chunk::<FIRST_FRAGMENT_PRELUDE_LEN>() else {
            return Err(MessageError::TruncatedPrelude {
                have: body.len(),
                need: FIRST_FRAGMENT_PRELUDE_LEN,
            });
        };
        let first = FirstFragment::new(read_wire_u16([low, high]), checksum);

        Ok(Self {
            header,
            payload: skip_prefix(body, FIRST_FRAGMENT_PRELUDE_LEN),
            first: Some(first),
        })
    }

    /// Decoded frame header.
    #[must_use]
    pub const fn header(&self) -> &FrameHeader { &self.header }

    /// Fragment payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Number of payload bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.payload.len() }

    /// Whether the fragment carries no payload bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.payload.is_empty() }

    /// Transaction metadata, present only on first fragments.
    #[must_use]
    pub const fn first_fragment(&self) -> Option<FirstFragment> { self.first }
}

fn expand(raw: &[u8], decoding: BodyDecoding<'_>) -> Result<Vec<u8>, MessageError> {
    if !decoding.enabled {
        return Err(MessageError::CompressionDisabled);
    }
    let decompressor = decoding
        .decompressor
        .ok_or(MessageError::MissingDecompressor)?;
    Ok(decompressor.decompress(raw, decoding.limit)?)
}

fn skip_prefix(body: Cow<'_, [u8]>, len: usize) -> Cow<'_, [u8]> {
    match body {
        Cow::Borrowed(bytes) => Cow::Borrowed(&bytes[len..]),
        Cow::Owned(mut bytes) => {
            bytes.drain(..len);
            Cow::Owned(bytes)
        }
    }
}
