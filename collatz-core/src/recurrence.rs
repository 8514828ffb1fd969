//! The Collatz recurrence and the loops that drive it.
//!
//! Odd terms use a fused step: `3n + 1` is always even, so the halving that follows it is
//! applied in the same operation. One fused step on an odd `n` therefore covers two textbook
//! steps, and every step count reported here is a fused-step count.

use std::fmt::Write;

use crate::utils::errors::CollatzError;

/// Next term of the fused recurrence.
///
/// Even `n` halves. Odd `n` maps to `(3n + 1) / 2`, computed as `2n - floor(n / 2)`:
/// `(3n + 1) / 2 = 2n - (n - 1) / 2`, and `n >> 1` already drops the low bit of an odd `n`.
///
/// Arithmetic wraps once `2n` exceeds `u64::MAX`. Use [`checked_next_collatz`] to detect it.
#[inline(always)]
pub fn next_collatz(n: u64) -> u64 {
    if n & 1 == 0 {
        n >> 1
    } else {
        (n << 1).wrapping_sub(n >> 1)
    }
}

/// [`next_collatz`] returning `None` when `(3n + 1) / 2` does not fit in `u64`.
///
/// For odd `n` the fused step equals `n + floor(n / 2) + 1`, so only the final sum can overflow.
/// `2n` may overflow while the result still fits, which is why the wrapping form stays exact.
#[inline(always)]
pub fn checked_next_collatz(n: u64) -> Option<u64> {
    if n & 1 == 0 {
        Some(n >> 1)
    } else {
        n.checked_add((n >> 1) + 1)
    }
}

/// Drives the recurrence from `n` until it drops to or below `n`, returning the fused steps taken.
///
/// The first step is always taken, so `test(1)` walks `1 -> 2 -> 1`. Assuming every smaller
/// value has been tested, falling to or below the start is enough to know `n` reaches 1.
#[inline]
pub fn test(n: u64) -> u64 {
    let mut value = next_collatz(n);
    let mut steps = 1;
    while value > n {
        value = next_collatz(value);
        steps += 1;
    }
    steps
}

/// [`test`] with overflow detection.
pub fn try_test(n: u64) -> Result<u64, CollatzError> {
    let step = |value: u64| {
        checked_next_collatz(value).ok_or(CollatzError::NumericOverflow { start: n, value })
    };
    let mut value = step(n)?;
    let mut steps = 1;
    while value > n {
        value = step(value)?;
        steps += 1;
    }
    Ok(steps)
}

/// Appends the full trajectory of `n` to `out` as one line: `"n,a,b,...,1,\n"`.
///
/// The line is rendered in full before anything reaches a sink, so lines from concurrently
/// tested values never interleave.
pub fn test_and_print(n: u64, out: &mut String) {
    let mut value = n;
    // Writing into a String cannot fail.
    let _ = write!(out, "{value}");
    while value > 1 {
        value = next_collatz(value);
        let _ = write!(out, ",{value}");
    }
    out.push_str(",\n");
}

/// [`test_and_print`] with overflow detection. `out` is left untouched on failure.
pub fn try_test_and_print(n: u64, out: &mut String) -> Result<(), CollatzError> {
    let mut line = String::new();
    let mut value = n;
    let _ = write!(line, "{value}");
    while value > 1 {
        value = checked_next_collatz(value)
            .ok_or(CollatzError::NumericOverflow { start: n, value })?;
        let _ = write!(line, ",{value}");
    }
    line.push_str(",\n");
    out.push_str(&line);
    Ok(())
}

/// The trajectory line of `n` as an owned string.
pub fn trajectory(n: u64) -> String {
    let mut line = String::new();
    test_and_print(n, &mut line);
    line
}

/// Fused steps needed to reach 1. `steps(1) == 0`.
pub fn steps(n: u64) -> u64 {
    let mut value = n;
    let mut steps = 0;
    while value > 1 {
        value = next_collatz(value);
        steps += 1;
    }
    steps
}

/// [`steps`] with overflow detection.
pub fn try_steps(n: u64) -> Result<u64, CollatzError> {
    let mut value = n;
    let mut steps = 0;
    while value > 1 {
        value = checked_next_collatz(value)
            .ok_or(CollatzError::NumericOverflow { start: n, value })?;
        steps += 1;
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    #[test]
    fn even_values_halve() {
        assert_eq!(next_collatz(2), 1);
        assert_eq!(next_collatz(6), 3);
        assert_eq!(next_collatz(1 << 40), 1 << 39);
    }

    #[test]
    fn odd_values_fuse_the_halving() {
        assert_eq!(next_collatz(7), 11);
        assert_eq!(next_collatz(9), 14);
        assert_eq!(next_collatz(1), 2);
        assert_eq!(next_collatz(27), 41);
    }

    #[test]
    fn odd_step_matches_textbook() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..10_000 {
            // Keep 3n + 1 inside u64.
            let n = rng.gen_range(0..(u64::MAX / 4)) | 1;
            assert_eq!(next_collatz(n), (3 * n + 1) / 2, "n = {n}");
            assert_eq!(checked_next_collatz(n), Some(next_collatz(n)));
        }
    }

    #[test]
    fn checked_step_detects_overflow() {
        // 2n leaves u64 here but (3n + 1) / 2 does not.
        let n = (1u64 << 63) + 1;
        assert_eq!(checked_next_collatz(n), Some(13_835_058_055_282_163_714));
        assert_eq!(checked_next_collatz(n), Some(next_collatz(n)));
        assert_eq!(checked_next_collatz(u64::MAX - 1), Some(u64::MAX / 2));

        // Largest odd n whose fused step still fits.
        let last_fit = 12_297_829_382_473_034_409u64;
        assert_eq!(checked_next_collatz(last_fit), Some(u64::MAX - 1));
        assert_eq!(next_collatz(last_fit), u64::MAX - 1);
        assert_eq!(checked_next_collatz(last_fit + 2), None);
        assert_eq!(checked_next_collatz(u64::MAX), None);
        // The wrapping variant still produces a value instead of panicking.
        let _ = next_collatz(u64::MAX);
    }

    #[test]
    fn every_value_to_2_pow_20_terminates() {
        const STEP_BOUND: u64 = 1_000;
        for n in 1..=(1u64 << 20) {
            let mut value = n;
            let mut taken = 0;
            while value != 1 {
                value = next_collatz(value);
                taken += 1;
                assert!(taken <= STEP_BOUND, "{n} did not reach 1 in {STEP_BOUND} steps");
            }
            assert_eq!(steps(n), taken);
        }
    }

    #[test]
    fn stopping_time() {
        assert_eq!(test(1), 2);
        assert_eq!(test(2), 1);
        // 3 -> 5 -> 8 -> 4 -> 2
        assert_eq!(test(3), 4);
        // 7 -> 11 -> 17 -> 26 -> 13 -> 20 -> 10 -> 5
        assert_eq!(test(7), 7);
        assert_eq!(try_test(7).unwrap(), 7);
    }

    #[test]
    fn try_test_reports_overflow() {
        let start = u64::MAX;
        match try_test(start) {
            Err(CollatzError::NumericOverflow { start: s, value }) => {
                assert_eq!(s, start);
                assert_eq!(value, start);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        // 2^63 + 1 -> 13835058055282163714 -> 6917529027641081857, below the start.
        let start = (1u64 << 63) + 1;
        assert_eq!(try_test(start).unwrap(), 2);
        assert_eq!(test(start), 2);
    }

    #[test]
    fn checked_trajectory_and_steps() {
        assert_eq!(try_steps(27).unwrap(), steps(27));
        assert_eq!(try_steps(1).unwrap(), 0);
        assert!(matches!(
            try_steps(u64::MAX),
            Err(CollatzError::NumericOverflow { start: u64::MAX, .. })
        ));

        let mut out = String::from("2,1,\n");
        try_test_and_print(3, &mut out).unwrap();
        assert_eq!(out, "2,1,\n3,5,8,4,2,1,\n");
        assert!(try_test_and_print(u64::MAX, &mut out).is_err());
        assert_eq!(out, "2,1,\n3,5,8,4,2,1,\n");
    }

    #[test]
    fn trajectory_lines() {
        assert_eq!(trajectory(1), "1,\n");
        assert_eq!(trajectory(2), "2,1,\n");
        assert_eq!(trajectory(3), "3,5,8,4,2,1,\n");
        assert_eq!(trajectory(6), "6,3,5,8,4,2,1,\n");

        let mut out = String::new();
        test_and_print(4, &mut out);
        test_and_print(5, &mut out);
        assert_eq!(out, "4,2,1,\n5,8,4,2,1,\n");
    }

    #[test]
    fn step_counts() {
        assert_eq!(steps(1), 0);
        assert_eq!(steps(2), 1);
        assert_eq!(steps(3), 5);
        // Textbook count for 27 is 111; 41 of those are odd steps fused with a halving.
        assert_eq!(steps(27), 70);
    }
}
