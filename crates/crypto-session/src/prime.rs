//! Trial-division primality testing

/// Deterministic primality check in `O(sqrt(n))`.
///
/// Trial divisors run up to and including `floor(sqrt(n))`, so squares of
/// primes are rejected. `i <= n / i` keeps the bound check from overflowing.
pub fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }

    let mut i = 2;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}
