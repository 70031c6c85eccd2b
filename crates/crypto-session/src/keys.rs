//! RSA key material and key generation

use shared_protocol::KeyAnnouncement;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::arith::{gcd, mod_inverse, pow_mod};
use crate::entropy::{RandomSource, sample_bits};
use crate::prime::is_prime;
use crate::{CryptoError, CryptoResult, E_BITS, MODULUS_LIMIT, P_BITS, Q_BITS};

/// Encrypt one character: `c^e mod n`
pub fn encrypt(c: u8, exponent: u32, modulus: u32) -> u32 {
    pow_mod(u32::from(c), exponent, modulus)
}

/// Decrypt one unit: `x^d mod n`, truncated to a character
pub fn decrypt(x: u32, exponent: u32, modulus: u32) -> u8 {
    pow_mod(x, exponent, modulus) as u8
}

/// Public half of a key pair, ours or the peer's
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    pub exponent: u32,
    pub modulus: u32,
}

impl PublicKey {
    pub fn new(exponent: u32, modulus: u32) -> Self {
        Self { exponent, modulus }
    }

    /// Reject keys our arithmetic cannot handle
    pub fn validate(&self) -> CryptoResult<()> {
        if self.modulus < 2 || self.modulus >= MODULUS_LIMIT {
            return Err(CryptoError::InvalidPublicKey {
                exponent: self.exponent,
                modulus: self.modulus,
            });
        }
        Ok(())
    }

    pub fn encrypt(&self, c: u8) -> u32 {
        encrypt(c, self.exponent, self.modulus)
    }
}

impl From<KeyAnnouncement> for PublicKey {
    fn from(key: KeyAnnouncement) -> Self {
        Self::new(key.exponent, key.modulus)
    }
}

impl From<PublicKey> for KeyAnnouncement {
    fn from(key: PublicKey) -> Self {
        KeyAnnouncement::new(key.exponent, key.modulus)
    }
}

/// Local RSA key pair. The private exponent is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    public_exponent: u32,
    private_exponent: u32,
    modulus: u32,
}

impl KeyPair {
    /// Assemble a key pair from known parts
    pub fn new(public_exponent: u32, private_exponent: u32, modulus: u32) -> Self {
        Self {
            public_exponent,
            private_exponent,
            modulus,
        }
    }

    pub fn public_exponent(&self) -> u32 {
        self.public_exponent
    }

    pub fn private_exponent(&self) -> u32 {
        self.private_exponent
    }

    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// Public key to announce to the peer
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.public_exponent, self.modulus)
    }

    pub fn decrypt(&self, unit: u32) -> u8 {
        decrypt(unit, self.private_exponent, self.modulus)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_exponent", &self.public_exponent)
            .field("private_exponent", &"<redacted>")
            .field("modulus", &self.modulus)
            .finish()
    }
}

/// Samples primes and exponents from a [`RandomSource`]
pub struct KeyGenerator<S> {
    source: S,
}

impl<S: RandomSource> KeyGenerator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Sample `bits`-bit values (top bit forced) until one is prime
    pub fn prime(&mut self, bits: u32) -> u32 {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let candidate = sample_bits(&mut self.source, bits);
            if is_prime(candidate) {
                debug!(bits, attempts, "Sampled prime");
                return candidate;
            }
        }
    }

    /// Sample exponents until one is coprime with `phi`
    pub fn public_exponent(&mut self, phi: u32) -> u32 {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let e = sample_bits(&mut self.source, E_BITS);
            if gcd(e, phi) == 1 {
                debug!(attempts, "Sampled public exponent");
                return e;
            }
        }
    }

    /// Generate a fresh key pair.
    ///
    /// p has 14 random bits and q has 15, so n = p * q stays below 2^31.
    pub fn generate_key_pair(&mut self) -> CryptoResult<KeyPair> {
        let p = self.prime(P_BITS);
        let q = self.prime(Q_BITS);
        let modulus = p * q;
        let phi = (p - 1) * (q - 1);

        let public_exponent = self.public_exponent(phi);
        let private_exponent = mod_inverse(public_exponent, phi)?;

        debug!(modulus, public_exponent, "Generated key pair");

        Ok(KeyPair::new(public_exponent, private_exponent, modulus))
    }

    /// Give the entropy source back
    pub fn into_source(self) -> S {
        self.source
    }
}
