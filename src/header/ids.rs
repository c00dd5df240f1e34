//! Single-byte identifiers carried in every frame header.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Address of a receiving node.
///
/// # Examples
///
/// ```
/// use lstream::NodeId;
/// assert_eq!(NodeId::new(7).get(), 7);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct NodeId(u8);

impl NodeId {
    /// Create a node identifier.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }
}

/// Logical conversation scope. Zero is reserved for "unassigned".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct SessionId(u8);

impl SessionId {
    /// The reserved, unassigned session.
    pub const UNASSIGNED: Self = Self(0);

    /// Create a session identifier.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Report whether this is the reserved zero session.
    #[must_use]
    pub const fn is_unassigned(self) -> bool { self.0 == 0 }
}

/// Eight-bit frame sequence number. Wraps from 255 to 0.
///
/// Comparisons that must survive wraparound go through
/// [`FrameNumber::is_behind`]; the derived `Ord` is plain numeric order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct FrameNumber(u8);

/// Half of the 8-bit sequence space. A frame within this distance behind the
/// reference is considered stale; anything further is a wrap forward.
const SERIAL_HALF_RANGE: u8 = 128;

impl FrameNumber {
    /// Create a frame number.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the raw sequence value.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Report whether `self` precedes `reference` in serial-number order.
    ///
    /// The forward distance from `self` to `reference` is taken modulo 256;
    /// `self` is behind when that distance is between 1 and 127 inclusive.
    /// Equal numbers are not behind, and a distance of 128 or more is read as
    /// the counter having wrapped past `reference`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lstream::FrameNumber;
    /// assert!(FrameNumber::new(3).is_behind(FrameNumber::new(9)));
    /// assert!(!FrameNumber::new(0).is_behind(FrameNumber::new(254)));
    /// assert!(!FrameNumber::new(9).is_behind(FrameNumber::new(9)));
    /// ```
    #[must_use]
    pub const fn is_behind(self, reference: Self) -> bool {
        let distance = reference.0.wrapping_sub(self.0);
        distance != 0 && distance < SERIAL_HALF_RANGE
    }

    /// Report whether `self` is strictly ahead of `reference` in serial order.
    #[must_use]
    pub const fn is_ahead(self, reference: Self) -> bool {
        self.0 != reference.0 && !self.is_behind(reference)
    }
}

/// Position of a fragment within its transaction. Zero marks the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct FragmentIndex(u8);

impl FragmentIndex {
    /// Create a fragment index.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the first fragment index.
    #[must_use]
    pub const fn zero() -> Self { Self(0) }

    /// Return the underlying value.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Report whether this index opens a transaction.
    #[must_use]
    pub const fn is_first(self) -> bool { self.0 == 0 }
}
