//! Wire format for the point-to-point link
//!
//! The link carries no length prefixes. Every message has a fixed shape and
//! both peers must stay in lock-step for framing to hold:
//!
//! ```text
//! 'C' | e (u32 LE) | n (u32 LE)    offer from the caller
//! 'A' | e (u32 LE) | n (u32 LE)    acknowledge from the listener
//! 'A'                              final acknowledge from the caller
//! u32 LE                           one ciphertext unit per character
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{KEY_BODY_SIZE, ProtocolError, ProtocolResult, UNIT_SIZE};

/// Single-byte message tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tag {
    /// Hello/offer, sent by the caller
    Offer = b'C',
    /// Acknowledge
    Ack = b'A',
}

impl Tag {
    /// Raw byte value on the wire
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parse a tag byte
    pub fn from_byte(byte: u8) -> ProtocolResult<Self> {
        match byte {
            b'C' => Ok(Self::Offer),
            b'A' => Ok(Self::Ack),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

/// Public exponent and modulus as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAnnouncement {
    pub exponent: u32,
    pub modulus: u32,
}

impl KeyAnnouncement {
    pub fn new(exponent: u32, modulus: u32) -> Self {
        Self { exponent, modulus }
    }

    /// Append the 8-byte body (exponent, then modulus)
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.exponent);
        buf.put_u32_le(self.modulus);
    }

    /// Read an 8-byte body
    pub fn decode(buf: &mut impl Buf) -> ProtocolResult<Self> {
        if buf.remaining() < KEY_BODY_SIZE {
            return Err(ProtocolError::Truncated {
                needed: KEY_BODY_SIZE,
                available: buf.remaining(),
            });
        }
        let exponent = buf.get_u32_le();
        let modulus = buf.get_u32_le();
        Ok(Self { exponent, modulus })
    }
}

/// A complete message as written to the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMessage {
    /// `'C'` followed by the caller's key
    Offer(KeyAnnouncement),
    /// `'A'` followed by the listener's key
    AckWithKey(KeyAnnouncement),
    /// Bare `'A'` finalizing the handshake
    Ack,
    /// Ciphertext unit during data exchange
    Unit(u32),
}

impl WireMessage {
    /// Number of bytes this message occupies on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Offer(_) | Self::AckWithKey(_) => 1 + KEY_BODY_SIZE,
            Self::Ack => 1,
            Self::Unit(_) => UNIT_SIZE,
        }
    }

    /// Append the wire encoding to `buf`
    pub fn encode(&self, buf: &mut impl BufMut) {
        match self {
            Self::Offer(key) => {
                buf.put_u8(Tag::Offer.as_byte());
                key.encode(buf);
            }
            Self::AckWithKey(key) => {
                buf.put_u8(Tag::Ack.as_byte());
                key.encode(buf);
            }
            Self::Ack => buf.put_u8(Tag::Ack.as_byte()),
            Self::Unit(value) => buf.put_u32_le(*value),
        }
    }

    /// Serialize to bytes for transmission
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Decode one little-endian ciphertext unit
pub fn decode_unit(buf: &mut impl Buf) -> ProtocolResult<u32> {
    if buf.remaining() < UNIT_SIZE {
        return Err(ProtocolError::Truncated {
            needed: UNIT_SIZE,
            available: buf.remaining(),
        });
    }
    Ok(buf.get_u32_le())
}
