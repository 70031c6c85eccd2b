//! Shared Protocol Definitions for Tether
//!
//! This crate contains the wire format, handshake states, roles, and
//! session configuration shared by both ends of a Tether link.

mod error;
mod packets;
mod session;

pub use error::*;
pub use packets::*;
pub use session::*;

/// Size of one little-endian integer on the wire (key field or ciphertext unit)
pub const UNIT_SIZE: usize = 4;

/// Size of a key announcement body: exponent followed by modulus
pub const KEY_BODY_SIZE: usize = 2 * UNIT_SIZE;

/// Size of a tagged key announcement (`'C'` or `'A'` plus the key body)
pub const TAGGED_KEY_SIZE: usize = 1 + KEY_BODY_SIZE;

/// Default handshake timeout in milliseconds
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: i64 = 1000;
