//! Crypto session error types

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("No inverse of {value} modulo {modulus}: not coprime")]
    NoInverse { value: u32, modulus: u32 },

    #[error("Invalid modulus: {0}")]
    InvalidModulus(u32),

    #[error("Invalid public key: exponent {exponent}, modulus {modulus}")]
    InvalidPublicKey { exponent: u32, modulus: u32 },
}

pub type CryptoResult<T> = Result<T, CryptoError>;
