//! Decompression collaborator used for frames with the compressed flag.
//!
//! The receiver treats the codec as opaque: anything implementing
//! [`Decompressor`] can be installed, including plain closures. A raw
//! DEFLATE implementation backed by `flate2` ships behind the `deflate`
//! feature.

use crate::error::DecompressError;

/// Expand a compressed frame body.
///
/// Implementations must never return more than `limit` bytes; oversized
/// output is reported as [`DecompressError::OutputTooLarge`].
pub trait Decompressor {
    /// Decompress `input`, producing at most `limit` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecompressError`] when `input` is not a valid stream or the
    /// output would exceed `limit`.
    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>, DecompressError>;
}

impl<F> Decompressor for F
where
    F: Fn(&[u8], usize) -> Result<Vec<u8>, DecompressError>,
{
    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>, DecompressError> {
        self(input, limit)
    }
}

impl std::fmt::Debug for dyn Decompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Decompressor")
    }
}

/// Raw DEFLATE (RFC 1951) decompressor.
#[cfg(feature = "deflate")]
#[derive(Clone, Copy, Debug, Default)]
pub struct DeflateDecompressor;

#[cfg(feature = "deflate")]
impl Decompressor for DeflateDecompressor {
    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>, DecompressError> {
        use std::io::Read;

        use flate2::read::DeflateDecoder;

        let mut output = Vec::new();
        // Read one byte past the limit so oversized output is detectable.
        let bound = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
        DeflateDecoder::new(input)
            .take(bound)
            .read_to_end(&mut output)
            .map_err(|err| DecompressError::Corrupt {
                reason: err.to_string(),
            })?;
        if output.len() > limit {
            return Err(DecompressError::OutputTooLarge { limit });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::Decompressor;
    use crate::error::DecompressError;

    #[test]
    fn closures_are_decompressors() {
        let upper = |input: &[u8], _limit: usize| -> Result<Vec<u8>, DecompressError> {
            Ok(input.to_ascii_uppercase())
        };
        assert_eq!(upper.decompress(b"abc", 3), Ok(b"ABC".to_vec()));
    }

    #[cfg(feature = "deflate")]
    mod deflate {
        use std::io::Write;

        use flate2::{Compression, write::DeflateEncoder};

        use crate::{
            compression::{Decompressor, DeflateDecompressor},
            error::DecompressError,
        };

        fn deflate(bytes: &[u8]) -> Vec<u8> {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes).expect("write to in-memory encoder");
            encoder.finish().expect("finish in-memory encoder")
        }

        #[test]
        fn inflates_within_limit() {
            let body = vec![0x5A_u8; 400];
            let output = DeflateDecompressor
                .decompress(&deflate(&body), 400)
                .expect("body fits the limit");
            assert_eq!(output, body);
        }

        #[test]
        fn rejects_output_beyond_limit() {
            let body = vec![0_u8; 401];
            assert_eq!(
                DeflateDecompressor.decompress(&deflate(&body), 400),
                Err(DecompressError::OutputTooLarge { limit: 400 })
            );
        }

        #[test]
        fn rejects_garbage() {
            let err = DeflateDecompressor
                .decompress(&[0xFF, 0xFF, 0xFF, 0xFF], 100)
                .expect_err("garbage is not deflate");
            assert!(matches!(err, DecompressError::Corrupt { .. }));
        }
    }
}
