//! Frame capture files for offline replay.
//!
//! A capture is a flat sequence of records, each holding one link-layer
//! frame and its arrival time relative to the start of the capture:
//!
//! ```text
//! [offset_ms: u32 LE][len: u16 LE][frame: len bytes]
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::config::FRAME_SIZE_LIMIT;

/// Bytes preceding each captured frame.
pub const RECORD_PREFIX_LEN: usize = 6;

/// Errors raised while reading or writing a capture.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The capture ends inside a record.
    #[error("record at byte {position} is truncated: need {need} bytes, have {have}")]
    Truncated {
        /// Offset of the record within the capture.
        position: usize,
        /// Bytes the record requires.
        need: usize,
        /// Bytes left in the capture.
        have: usize,
    },
    /// A frame exceeds the link frame size.
    #[error("frame of {len} bytes exceeds the {limit}-byte frame limit")]
    Oversized {
        /// Declared frame length.
        len: usize,
        /// Largest allowed frame.
        limit: usize,
    },
    /// An arrival offset does not fit the record field.
    #[error("arrival offset {millis} ms does not fit in 32 bits")]
    OffsetOutOfRange {
        /// Offset in milliseconds.
        millis: u128,
    },
}

/// One captured frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRecord<'a> {
    /// Arrival time relative to the start of the capture.
    pub offset: Duration,
    /// Raw frame bytes.
    pub frame: &'a [u8],
}

/// Iterator over the records of an in-memory capture.
///
/// Iteration stops after the first error.
#[derive(Clone, Debug)]
pub struct CaptureReader<'a> {
    remaining: &'a [u8],
    position: usize,
    failed: bool,
}

impl<'a> CaptureReader<'a> {
    /// Read records from `capture`.
    #[must_use]
    pub const fn new(capture: &'a [u8]) -> Self {
        Self {
            remaining: capture,
            position: 0,
            failed: false,
        }
    }

    fn next_record(&mut self) -> Result<CaptureRecord<'a>, CaptureError> {
        let mut cursor = self.remaining;
        if cursor.remaining() < RECORD_PREFIX_LEN {
            return Err(self.truncated(RECORD_PREFIX_LEN));
        }
        let millis = cursor.get_u32_le();
        let len = usize::from(cursor.get_u16_le());
        if len > FRAME_SIZE_LIMIT {
            return Err(CaptureError::Oversized {
                len,
                limit: FRAME_SIZE_LIMIT,
            });
        }
        let Some((frame, rest)) = cursor.split_at_checked(len) else {
            return Err(self.truncated(RECORD_PREFIX_LEN + len));
        };

        self.remaining = rest;
        self.position += RECORD_PREFIX_LEN + len;
        Ok(CaptureRecord {
            offset: Duration::from_millis(u64::from(millis)),
            frame,
        })
    }

    const fn truncated(&self, need: usize) -> CaptureError {
        CaptureError::Truncated {
            position: self.position,
            need,
            have: self.remaining.len(),
        }
    }
}

impl<'a> Iterator for CaptureReader<'a> {
    type Item = Result<CaptureRecord<'a>, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining.is_empty() {
            return None;
        }
        let record = self.next_record();
        self.failed = record.is_err();
        Some(record)
    }
}

/// Append one record to `out`.
///
/// # Errors
///
/// Returns [`CaptureError::Oversized`] for frames longer than
/// [`FRAME_SIZE_LIMIT`] and [`CaptureError::OffsetOutOfRange`] when `offset`
/// does not fit in 32 bits of milliseconds. `out` is untouched on error.
pub fn encode_record<B: BufMut>(
    offset: Duration,
    frame: &[u8],
    out: &mut B,
) -> Result<(), CaptureError> {
    let millis = offset.as_millis();
    let millis = u32::try_from(millis).map_err(|_| CaptureError::OffsetOutOfRange { millis })?;
    let oversized = CaptureError::Oversized {
        len: frame.len(),
        limit: FRAME_SIZE_LIMIT,
    };
    if frame.len() > FRAME_SIZE_LIMIT {
        return Err(oversized);
    }
    let len = u16::try_from(frame.len()).map_err(|_| oversized)?;

    out.put_u32_le(millis);
    out.put_u16_le(len);
    out.put_slice(frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::byte_order::write_wire_u16;

    fn capture(records: &[(u64, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (millis, frame) in records {
            encode_record(Duration::from_millis(*millis), frame, &mut out).expect("encodable");
        }
        out
    }

    #[test]
    fn reads_records_in_order() {
        let bytes = capture(&[(0, &[1, 2, 3]), (250, &[]), (1_000, &[9])]);
        let records: Vec<_> = CaptureReader::new(&bytes)
            .collect::<Result<_, _>>()
            .expect("well-formed capture");
        assert_eq!(
            records,
            vec![
                CaptureRecord {
                    offset: Duration::ZERO,
                    frame: &[1, 2, 3],
                },
                CaptureRecord {
                    offset: Duration::from_millis(250),
                    frame: &[],
                },
                CaptureRecord {
                    offset: Duration::from_secs(1),
                    frame: &[9],
                },
            ]
        );
    }

    #[rstest]
    #[case::inside_prefix(3, 0)]
    #[case::inside_frame(8, 0)]
    fn truncation_stops_iteration(#[case] keep: usize, #[case] position: usize) {
        let bytes = capture(&[(5, &[1, 2, 3, 4])]);
        let mut reader = CaptureReader::new(&bytes[..keep]);
        let err = reader
            .next()
            .expect("a record is attempted")
            .expect_err("record is truncated");
        assert!(matches!(err, CaptureError::Truncated { position: p, .. } if p == position));
        assert!(reader.next().is_none());
    }

    #[test]
    fn rejects_oversized_frames() {
        let frame = vec![0; FRAME_SIZE_LIMIT + 1];
        let mut out = Vec::new();
        assert_eq!(
            encode_record(Duration::ZERO, &frame, &mut out),
            Err(CaptureError::Oversized {
                len: FRAME_SIZE_LIMIT + 1,
                limit: FRAME_SIZE_LIMIT,
            })
        );
        assert!(out.is_empty());

        let mut forged = vec![0, 0, 0, 0];
        forged.extend_from_slice(&write_wire_u16(u16::MAX));
        assert!(matches!(
            CaptureReader::new(&forged).next(),
            Some(Err(CaptureError::Oversized { .. }))
        ));
    }
}
