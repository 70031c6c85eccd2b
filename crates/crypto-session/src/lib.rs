//! Crypto Session - Textbook RSA for Tether
//!
//! Provides 32-bit modular arithmetic, prime sampling from an injected bit
//! source, RSA key generation, and the per-character cipher used once the
//! handshake has exchanged public keys.

pub mod arith;
mod entropy;
mod error;
mod keys;
pub mod prime;
mod session;

pub use arith::{gcd, mod_inverse, mul_mod, pow_mod};
pub use entropy::*;
pub use error::*;
pub use keys::*;
pub use prime::is_prime;
pub use session::*;

/// Bit length used when sampling the first prime (p)
pub const P_BITS: u32 = 14;

/// Bit length used when sampling the second prime (q)
pub const Q_BITS: u32 = 15;

/// Bit length used when sampling the public exponent
pub const E_BITS: u32 = 14;

/// Every modulus must stay below this bound for `mul_mod` to be exact
pub const MODULUS_LIMIT: u32 = 1 << 31;
