//! Numeric helpers that work without `std`.
//!
//! Integer routines (`isqrt`, `gcd`, modular arithmetic, Miller–Rabin) are
//! exact. The float routines `ln` and `exp` forward to the std intrinsics when
//! the `std` feature is enabled and otherwise use range reduction plus a short
//! series, accurate to a few ulps over the ranges this crate needs.

/// Floor of the square root of `n`, computed with integer Newton iteration.
///
/// Never goes through floating point, so the bound is exact for every `u64`.
pub(crate) fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let bits = 64 - n.leading_zeros();
    // Start at 2^ceil(bits/2), which is always >= sqrt(n).
    let mut x: u64 = 1 << ((bits + 1) / 2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Greatest common divisor by Euclid.
pub(crate) fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// `(a * b) mod m` without overflow.
#[inline]
pub(crate) fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

/// `(base ^ exp) mod m` by square-and-multiply.
pub(crate) fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut acc = 1 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    acc
}

/// Deterministic Miller–Rabin for the full `u64` range.
///
/// The first twelve primes as witnesses are sufficient for n < 3.3 × 10^24.
pub(crate) fn is_prime(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    if n < 2 {
        return false;
    }
    for &p in WITNESSES.iter() {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }
    'witness: for &a in WITNESSES.iter() {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

// ─── Float helpers ───────────────────────────────────────────────────────────

#[cfg(not(feature = "std"))]
const LN2: f64 = core::f64::consts::LN_2;

/// Natural logarithm. Returns `-inf` for 0 and NaN for negative input.
#[cfg(feature = "std")]
pub(crate) fn ln(x: f64) -> f64 {
    x.ln()
}

/// Natural logarithm. Returns `-inf` for 0 and NaN for negative input.
#[cfg(not(feature = "std"))]
pub(crate) fn ln(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x.is_infinite() {
        return f64::INFINITY;
    }

    // Normalise subnormals so the exponent field is meaningful.
    let (mut x, mut e) = (x, 0i64);
    if x < f64::MIN_POSITIVE {
        x *= (1u64 << 54) as f64;
        e -= 54;
    }

    // x = m * 2^e with m in [1, 2)
    let bits = x.to_bits();
    e += ((bits >> 52) & 0x7ff) as i64 - 1023;
    let mut m = f64::from_bits((bits & 0x000f_ffff_ffff_ffff) | 0x3ff0_0000_0000_0000);
    if m > core::f64::consts::SQRT_2 {
        m *= 0.5;
        e += 1;
    }

    // ln(m) = 2 * atanh(s), s = (m - 1) / (m + 1), |s| <= 0.172
    let s = (m - 1.0) / (m + 1.0);
    let s2 = s * s;
    let mut term = s;
    let mut sum = 0.0;
    let mut k = 1.0;
    for _ in 0..12 {
        sum += term / k;
        term *= s2;
        k += 2.0;
    }
    2.0 * sum + e as f64 * LN2
}

/// Exponential function. Saturates to 0 and `+inf` outside the f64 range.
#[cfg(feature = "std")]
pub(crate) fn exp(x: f64) -> f64 {
    x.exp()
}

/// Exponential function. Saturates to 0 and `+inf` outside the f64 range.
#[cfg(not(feature = "std"))]
pub(crate) fn exp(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x > 709.78 {
        return f64::INFINITY;
    }
    if x < -745.2 {
        return 0.0;
    }

    // Range reduction: x = k*ln2 + r, |r| <= ln2/2
    let t = x / LN2;
    let k = if t >= 0.0 { (t + 0.5) as i64 } else { (t - 0.5) as i64 };
    let r = x - k as f64 * LN2;

    // Taylor series of exp(r), Horner form, degree 13.
    let mut poly = 1.0;
    let mut n = 13.0;
    while n > 0.0 {
        poly = 1.0 + r * poly / n;
        n -= 1.0;
    }

    scale_pow2(poly, k)
}

/// Multiply `v` by 2^k, splitting the scale so subnormal results survive.
#[cfg(not(feature = "std"))]
fn scale_pow2(mut v: f64, mut k: i64) -> f64 {
    while k > 1023 {
        v *= f64::from_bits(((1023 + 1023) as u64) << 52);
        k -= 1023;
    }
    while k < -1022 {
        v *= f64::from_bits(1u64 << 52); // 2^-1022
        k += 1022;
    }
    v * f64::from_bits(((k + 1023) as u64) << 52)
}
