//! Capacity growth policy.
//!
//! Push or insert on a full array, and bulk appends, go through this
//! policy. Explicit reserve and resize allocate exactly what is asked.

use crate::error::{Error, Result};

/// Factor applied to the current capacity when a full array grows.
pub const GROWTH_FACTOR: usize = 2;

/// Capacity of the first allocation of an empty array.
pub const MIN_NON_ZERO_CAP: usize = 1;

/// Returns the capacity a full array of given capacity grows to.
#[inline]
pub fn next_capacity(cap: usize) -> Result<usize> {
    if cap == 0 {
        return Ok(MIN_NON_ZERO_CAP);
    }
    cap.checked_mul(GROWTH_FACTOR)
        .ok_or(Error::CapacityOverflow(cap))
}
