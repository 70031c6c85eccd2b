//! Modular arithmetic over 32-bit unsigned integers
//!
//! All moduli must satisfy `1 <= m < 2^31`. The bound is what keeps the
//! doubling in [`mul_mod`] inside 32 bits; it is a documented precondition
//! and is not checked. Larger moduli give silently wrong results.

use crate::{CryptoError, CryptoResult};

/// Compute `(a * b) % m` without a 64-bit intermediate.
///
/// Double-and-add over the bits of `b`: the running sum and the doubled
/// addend are each below `m`, so their sum stays below `2^32`.
pub fn mul_mod(a: u32, b: u32, m: u32) -> u32 {
    let mut result = 0;
    let mut doubled = a % m;
    let mut b = b;

    while b > 0 {
        if b & 1 == 1 {
            result = (result + doubled) % m;
        }
        doubled = (doubled << 1) % m;
        b >>= 1;
    }

    result
}

/// Compute `a^b % m` by square-and-multiply on top of [`mul_mod`].
///
/// `pow_mod(x, 0, 1)` is 0, like every other result modulo 1.
pub fn pow_mod(a: u32, b: u32, m: u32) -> u32 {
    let mut result = 1 % m;
    let mut square = a % m;
    let mut b = b;

    while b > 0 {
        if b & 1 == 1 {
            result = mul_mod(result, square, m);
        }
        square = mul_mod(square, square, m);
        b >>= 1;
    }

    result
}

/// Greatest common divisor
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b > 0 {
        a %= b;
        std::mem::swap(&mut a, &mut b);
    }
    a
}

/// Representative of `x` in `0..m`
pub fn reduce_mod(x: i64, m: u32) -> u32 {
    x.rem_euclid(i64::from(m)) as u32
}

/// Find `d` in `0..modulus` with `value * d ≡ 1 (mod modulus)`.
///
/// Iterative extended Euclid. Each row holds a remainder and its Bézout
/// coefficient for `value`; rows are appended until the remainder hits zero,
/// and the coefficient on the row before it is the inverse.
pub fn mod_inverse(value: u32, modulus: u32) -> CryptoResult<u32> {
    if modulus < 2 {
        return Err(CryptoError::InvalidModulus(modulus));
    }
    if gcd(value, modulus) != 1 {
        return Err(CryptoError::NoInverse { value, modulus });
    }

    let mut rows: Vec<(i64, i64)> = vec![(i64::from(value), 1), (i64::from(modulus), 0)];
    loop {
        let len = rows.len();
        let (r_prev, s_prev) = rows[len - 2];
        let (r, s) = rows[len - 1];
        if r == 0 {
            return Ok(reduce_mod(s_prev, modulus));
        }
        let q = r_prev / r;
        rows.push((r_prev - q * r, s_prev - q * s));
    }
}
