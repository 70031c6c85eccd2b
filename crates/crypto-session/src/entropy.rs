//! Entropy sources for key generation
//!
//! Key generation never touches system randomness directly. It pulls single
//! bits from a [`RandomSource`], so production can feed it OS entropy while
//! tests feed it a seeded RNG or a fixed bit pattern.

use rand::RngCore;

/// Supplier of raw random bits, one per call.
///
/// Quality is the implementor's concern. Key generation only assumes that
/// both outcomes keep appearing, otherwise its resampling loops never end.
pub trait RandomSource {
    fn next_bit(&mut self) -> bool;
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn next_bit(&mut self) -> bool {
        (**self).next_bit()
    }
}

/// Adapts any `rand` generator into a bit source
#[derive(Debug, Clone)]
pub struct RngBitSource<R> {
    rng: R,
    buffer: u32,
    remaining: u32,
}

impl<R: RngCore> RngBitSource<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            buffer: 0,
            remaining: 0,
        }
    }
}

impl<R: RngCore> RandomSource for RngBitSource<R> {
    fn next_bit(&mut self) -> bool {
        if self.remaining == 0 {
            self.buffer = self.rng.next_u32();
            self.remaining = u32::BITS;
        }
        let bit = self.buffer & 1 == 1;
        self.buffer >>= 1;
        self.remaining -= 1;
        bit
    }
}

/// Replays a fixed bit pattern, wrapping around at the end
#[derive(Debug, Clone)]
pub struct BitSequence {
    bits: Vec<bool>,
    position: usize,
}

impl BitSequence {
    /// # Panics
    /// Panics if `bits` is empty.
    pub fn new(bits: Vec<bool>) -> Self {
        assert!(!bits.is_empty(), "bit sequence must not be empty");
        Self { bits, position: 0 }
    }

    /// Bits of `value`, least significant first, `width` of them
    pub fn from_value(value: u32, width: u32) -> Self {
        Self::new((0..width).map(|i| (value >> i) & 1 == 1).collect())
    }
}

impl RandomSource for BitSequence {
    fn next_bit(&mut self) -> bool {
        let bit = self.bits[self.position];
        self.position = (self.position + 1) % self.bits.len();
        bit
    }
}

/// Assemble a `bits`-bit sample with bit `bits` forced high.
///
/// Bit `i` of the result is the `i`-th bit drawn, so the value always lies
/// in `2^bits .. 2^(bits + 1)`. `bits` must be at most 31.
pub fn sample_bits(source: &mut impl RandomSource, bits: u32) -> u32 {
    let mut value = 0u32;
    for i in 0..bits {
        if source.next_bit() {
            value |= 1 << i;
        }
    }
    value | (1 << bits)
}
