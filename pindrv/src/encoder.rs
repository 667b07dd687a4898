//! One-hot output encoding.
//!
//! Pure functions: a selector index becomes a bitmask with exactly one bit
//! set, validated against the pin-set cardinality. Encoding is separated
//! from the write so the write primitive never re-validates caller intent.

use pindrv_common::config::MAX_LINES;
use pindrv_common::error::EncodeError;

/// Encode a selector as a one-hot bitmask over `pin_count` lines.
///
/// # Errors
/// Returns `EncodeError::OutOfRange` unless `0 <= selector < pin_count`.
pub fn encode(selector: u8, pin_count: usize) -> Result<u64, EncodeError> {
    debug_assert!(pin_count <= MAX_LINES);
    if (selector as usize) < pin_count {
        Ok(1u64 << selector)
    } else {
        Err(EncodeError::OutOfRange {
            selector,
            pin_count,
        })
    }
}

/// The all-lines-off bitmask, used for teardown and clear-before-set.
pub fn all_off(_pin_count: usize) -> u64 {
    0
}
