//! Producer-side slot encoders.
//!
//! These mirror what a conforming module computes before returning, so the
//! module generator and tests can build exact slot values.

use crate::scratch::Scratch;

/// Pack two 32-bit words into a slot: `low` is `pair[0]`, `high` is `pair[1]`.
pub fn pair(low: u32, high: u32) -> f64 {
    f64::from_bits(((high as u64) << 32) | low as u64)
}

/// Encode a `(offset, length)` slice descriptor.
pub fn slice(offset: u32, len: u32) -> f64 {
    pair(offset, len)
}

/// Encode a 64-bit unsigned integer bit-for-bit.
pub fn u64(x: u64) -> f64 {
    f64::from_bits(x)
}

/// Encode a 64-bit signed integer bit-for-bit.
pub fn i64(x: i64) -> f64 {
    u64(x as u64)
}

pub fn bool(x: bool) -> f64 {
    x as u8 as f64
}

/// The slot of a void return.
pub fn void() -> f64 {
    0.0
}

/// Split a slot back into its pair.
pub fn split(slot: f64) -> [u32; 2] {
    Scratch::new(slot).u32_pair()
}
