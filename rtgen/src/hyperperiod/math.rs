/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Integer helpers for horizon arithmetic: GCD, checked LCM, rounding up to a
//! hyperperiod boundary.

use super::HyperperiodError;

/// Iterative Euclidean GCD.  `gcd(0, n) == n`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Checked LCM computed as `(a / gcd) * b`.  Returns `Ok(0)` when either
/// input is `0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// LCM of every period in the slice.  `Ok(0)` for an empty slice.
pub fn lcm_of_slice(periods: &[u64]) -> Result<u64, HyperperiodError> {
    match periods.split_first() {
        None => Ok(0),
        Some((&first, rest)) => rest.iter().try_fold(first, |acc, &p| lcm(acc, p)),
    }
}

/// Smallest multiple of `step` that is `>= value`.  `step` must be non-zero.
pub fn round_up_to_multiple(value: u64, step: u64) -> Result<u64, HyperperiodError> {
    value
        .div_ceil(step)
        .checked_mul(step)
        .ok_or(HyperperiodError::Overflow { a: value, b: step })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
