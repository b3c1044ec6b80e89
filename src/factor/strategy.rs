/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Uncached factorization strategies.
//!
//! Every function here returns the prime factors of `n` in non-decreasing
//! order with multiplicity, and an empty vector for `n <= 1`. All square-root
//! bounds are exact integer square roots refreshed after each extraction.

use alloc::vec::Vec;

use crate::math::{gcd, is_prime, isqrt, mul_mod};

/// The first twenty primes, divided out before odd trial division.
pub const SMALL_PRIMES: [u64; 20] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
];

/// Increments of the mod-30 wheel starting at 7: 7, 11, 13, 17, 19, 23, 29, 31, ...
const WHEEL_30: [u64; 8] = [4, 2, 4, 2, 4, 6, 2, 6];

/// Polynomial constants `c` tried for `x <- x^2 + c` before giving up on rho.
const RHO_CONSTANTS: [u64; 4] = [1, 2, 3, 5];

/// Strategy for inputs at or above the large threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LargeStrategy {
    /// Pollard's rho cycle detection, guarded by Miller–Rabin.
    #[default]
    PollardRho,
    /// Trial division over a mod-30 wheel.
    Wheel,
    /// Plain odd trial division, the same as small inputs.
    TrialDivision,
}

/// Divide out small primes, then odd candidates up to `isqrt(remaining)`.
pub fn trial_division(n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n <= 1 {
        return factors;
    }
    let mut rest = n;

    for &p in SMALL_PRIMES.iter() {
        while rest % p == 0 {
            factors.push(p);
            rest /= p;
        }
        if rest == 1 {
            return factors;
        }
        if p * p > rest {
            factors.push(rest);
            return factors;
        }
    }

    let mut candidate = SMALL_PRIMES[SMALL_PRIMES.len() - 1] + 2;
    let mut bound = isqrt(rest);
    while candidate <= bound {
        if rest % candidate == 0 {
            while rest % candidate == 0 {
                factors.push(candidate);
                rest /= candidate;
            }
            bound = isqrt(rest);
        }
        candidate += 2;
    }
    if rest > 1 {
        factors.push(rest);
    }
    factors
}

/// Trial division that skips multiples of 2, 3 and 5.
pub fn wheel_factorize(n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n <= 1 {
        return factors;
    }
    let mut rest = n;
    for p in [2u64, 3, 5] {
        while rest % p == 0 {
            factors.push(p);
            rest /= p;
        }
    }

    let mut candidate = 7u64;
    let mut spoke = 0;
    let mut bound = isqrt(rest);
    while candidate <= bound {
        if rest % candidate == 0 {
            while rest % candidate == 0 {
                factors.push(candidate);
                rest /= candidate;
            }
            bound = isqrt(rest);
        }
        candidate += WHEEL_30[spoke];
        spoke = (spoke + 1) % WHEEL_30.len();
    }
    if rest > 1 {
        factors.push(rest);
    }
    factors
}

/// Find a non-trivial divisor of composite `n` with Floyd cycle detection.
///
/// Iterates `x <- x^2 + c mod n` with `y` moving twice as fast and checks
/// `gcd(|x - y|, n)`. Returns `None` when every constant hits `d == n`.
pub fn pollard_rho(n: u64) -> Option<u64> {
    if n % 2 == 0 {
        return Some(2);
    }
    for &c in RHO_CONSTANTS.iter() {
        let step = |v: u64| ((mul_mod(v, v, n) as u128 + c as u128) % n as u128) as u64;
        let (mut x, mut y, mut d) = (2u64, 2u64, 1u64);
        while d == 1 {
            x = step(x);
            y = step(step(y));
            d = gcd(x.abs_diff(y), n);
        }
        if d != n {
            return Some(d);
        }
    }
    None
}

/// Full factorization driven by Pollard's rho.
///
/// Small primes are stripped first. Each remaining cofactor is either below
/// `small_limit` (trial division), prime (kept), or split by rho; when rho
/// fails the cofactor falls back to trial division. The work list is an
/// explicit stack, and the merged result is sorted ascending.
pub fn pollard_factorize(n: u64, small_limit: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n <= 1 {
        return factors;
    }
    let mut rest = n;
    for &p in SMALL_PRIMES.iter() {
        while rest % p == 0 {
            factors.push(p);
            rest /= p;
        }
    }

    let mut pending = Vec::new();
    if rest > 1 {
        pending.push(rest);
    }
    while let Some(m) = pending.pop() {
        if m < small_limit {
            factors.extend(trial_division(m));
        } else if is_prime(m) {
            factors.push(m);
        } else {
            match pollard_rho(m) {
                Some(d) => {
                    pending.push(d);
                    pending.push(m / d);
                }
                None => factors.extend(trial_division(m)),
            }
        }
    }
    factors.sort_unstable();
    factors
}
