//! Helpers for explicit little-endian wire conversions.
//!
//! The fragment-0 transaction size is the only multi-byte integer on the
//! Little Stream wire, and it is little-endian. These helpers keep
//! Clippy expectations scoped to the conversion points so protocol code can
//! stay explicit about wire endianness without repeating lint annotations.

/// Serialise a `u16` in wire byte order (little-endian).
///
/// # Examples
///
/// ```
/// use lstream::byte_order::write_wire_u16;
///
/// assert_eq!(write_wire_u16(0x1234), [0x34, 0x12]);
/// ```
#[must_use]
pub fn write_wire_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::little_endian_bytes,
        reason = "Little Stream encodes multi-byte integers little-endian."
    )]
    value.to_le_bytes()
}

/// Parse a wire-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use lstream::byte_order::read_wire_u16;
///
/// assert_eq!(read_wire_u16([0x58, 0x02]), 600);
/// ```
#[must_use]
pub fn read_wire_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::little_endian_bytes,
        reason = "Little Stream encodes multi-byte integers little-endian."
    )]
    u16::from_le_bytes(bytes)
}
