//! One-byte transaction checksum.

use serde::{Deserialize, Serialize};

/// Exclusive-or of every byte in `payload`.
///
/// The result does not depend on byte order, so it detects corrupted bytes
/// but not misplaced fragments.
///
/// # Examples
///
/// ```
/// use lstream::checksum::xor_checksum;
/// assert_eq!(xor_checksum(&[0x0F, 0xF0, 0x01]), 0xFE);
/// assert_eq!(xor_checksum(&[]), 0);
/// ```
#[must_use]
pub fn xor_checksum(payload: &[u8]) -> u8 { payload.iter().fold(0, |acc, byte| acc ^ byte) }

/// What to do with a completed transaction whose checksum does not match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Drop the transaction.
    #[default]
    Strict,
    /// Deliver the transaction anyway.
    Permissive,
}

impl ChecksumPolicy {
    /// Report whether a transaction with the given checksum verdict may be
    /// delivered.
    #[must_use]
    pub const fn allows(self, checksum_matches: bool) -> bool {
        checksum_matches || matches!(self, Self::Permissive)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ChecksumPolicy, xor_checksum};

    #[test]
    fn checksum_ignores_byte_order() {
        assert_eq!(xor_checksum(&[1, 2, 3, 4]), xor_checksum(&[4, 3, 2, 1]));
    }

    #[test]
    fn checksum_of_repeated_pair_cancels() {
        assert_eq!(xor_checksum(&[0xAA, 0xAA]), 0);
    }

    #[rstest]
    #[case(ChecksumPolicy::Strict, true, true)]
    #[case(ChecksumPolicy::Strict, false, false)]
    #[case(ChecksumPolicy::Permissive, true, true)]
    #[case(ChecksumPolicy::Permissive, false, true)]
    fn policy_gates_delivery(
        #[case] policy: ChecksumPolicy,
        #[case] matches: bool,
        #[case] allowed: bool,
    ) {
        assert_eq!(policy.allows(matches), allowed);
    }
}
