//! Bit-level reinterpretation of the 64-bit return slot.
//!
//! A [`Scratch`] cell holds the eight raw bytes of one slot and exposes them
//! under every element width the wire format uses.  It is the only place that
//! reinterprets bits; everything else goes through it.  The cell is a plain
//! `Copy` value living on the caller's stack, so concurrent callers never
//! share it.

use serde::Serialize;

use crate::descriptor::Transform;

/// Eight bytes viewed under one of ten element interpretations.
///
/// Views are little-endian, matching WebAssembly linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scratch([u8; 8]);

impl Scratch {
    /// Load the raw bits of a slot value.
    pub fn new(slot: f64) -> Self {
        Self(slot.to_bits().to_le_bytes())
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Overwrite the cell with a new slot value.
    pub fn store(&mut self, slot: f64) {
        self.0 = slot.to_bits().to_le_bytes();
    }

    pub fn bytes(&self) -> [u8; 8] {
        self.0
    }

    pub fn u8_octet(&self) -> [u8; 8] {
        self.0
    }

    pub fn i8_octet(&self) -> [i8; 8] {
        self.0.map(|b| b as i8)
    }

    pub fn u16_quartet(&self) -> [u16; 4] {
        std::array::from_fn(|i| u16::from_le_bytes([self.0[2 * i], self.0[2 * i + 1]]))
    }

    pub fn i16_quartet(&self) -> [i16; 4] {
        self.u16_quartet().map(|x| x as i16)
    }

    /// The pair: `[low word, high word]`.
    pub fn u32_pair(&self) -> [u32; 2] {
        std::array::from_fn(|i| {
            let b = &self.0[4 * i..4 * i + 4];
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    }

    pub fn i32_pair(&self) -> [i32; 2] {
        self.u32_pair().map(|x| x as i32)
    }

    pub fn f32_pair(&self) -> [f32; 2] {
        self.u32_pair().map(f32::from_bits)
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    pub fn as_i64(&self) -> i64 {
        i64::from_le_bytes(self.0)
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(self.as_u64())
    }

    /// Reinterpret through one of the seven packed transforms.
    ///
    /// Returns `None` for transforms that are not packed.
    pub fn packed(&self, transform: Transform) -> Option<Packed> {
        let packed = match transform {
            Transform::U8Octet => Packed::U8Octet(self.u8_octet()),
            Transform::I8Octet => Packed::I8Octet(self.i8_octet()),
            Transform::U16Quartet => Packed::U16Quartet(self.u16_quartet()),
            Transform::I16Quartet => Packed::I16Quartet(self.i16_quartet()),
            Transform::U32Pair => Packed::U32Pair(self.u32_pair()),
            Transform::I32Pair => Packed::I32Pair(self.i32_pair()),
            Transform::F32Pair => Packed::F32Pair(self.f32_pair()),
            _ => return None,
        };
        Some(packed)
    }
}

/// A small fixed-size array packed into the 64 bits of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Packed {
    U8Octet([u8; 8]),
    I8Octet([i8; 8]),
    U16Quartet([u16; 4]),
    I16Quartet([i16; 4]),
    U32Pair([u32; 2]),
    I32Pair([i32; 2]),
    F32Pair([f32; 2]),
}

impl Packed {
    /// Encode into a slot value.
    pub fn to_slot(&self) -> f64 {
        let mut bytes = [0u8; 8];
        match self {
            Self::U8Octet(xs) => bytes = *xs,
            Self::I8Octet(xs) => bytes = xs.map(|x| x as u8),
            Self::U16Quartet(xs) => put(&mut bytes, xs.iter().map(|x| x.to_le_bytes())),
            Self::I16Quartet(xs) => put(&mut bytes, xs.iter().map(|x| x.to_le_bytes())),
            Self::U32Pair(xs) => put(&mut bytes, xs.iter().map(|x| x.to_le_bytes())),
            Self::I32Pair(xs) => put(&mut bytes, xs.iter().map(|x| x.to_le_bytes())),
            Self::F32Pair(xs) => put(&mut bytes, xs.iter().map(|x| x.to_le_bytes())),
        }
        Scratch::from_bytes(bytes).as_f64()
    }

    /// The transform that decodes this packing.
    pub fn transform(&self) -> Transform {
        match self {
            Self::U8Octet(_) => Transform::U8Octet,
            Self::I8Octet(_) => Transform::I8Octet,
            Self::U16Quartet(_) => Transform::U16Quartet,
            Self::I16Quartet(_) => Transform::I16Quartet,
            Self::U32Pair(_) => Transform::U32Pair,
            Self::I32Pair(_) => Transform::I32Pair,
            Self::F32Pair(_) => Transform::F32Pair,
        }
    }
}

fn put<const N: usize>(out: &mut [u8; 8], chunks: impl Iterator<Item = [u8; N]>) {
    for (i, chunk) in chunks.enumerate() {
        out[i * N..(i + 1) * N].copy_from_slice(&chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_low_then_high_word() {
        let slot = f64::from_bits(0xfff8_0000_0000_002a);
        assert_eq!(Scratch::new(slot).u32_pair(), [0x2a, 0xfff8_0000]);
    }

    #[test]
    fn test_views_overlay_the_same_bytes() {
        let cell = Scratch::from_bytes([0x01, 0x80, 0xff, 0x7f, 0, 0, 0x80, 0x3f]);
        assert_eq!(cell.u8_octet()[1], 0x80);
        assert_eq!(cell.i8_octet()[1], -128);
        assert_eq!(cell.u16_quartet()[0], 0x8001);
        assert_eq!(cell.i16_quartet()[1], 0x7fff);
        assert_eq!(cell.i32_pair()[0], 0x7fff_8001);
        assert_eq!(cell.f32_pair()[1], 1.0);
        assert_eq!(cell.as_u64(), 0x3f80_0000_7fff_8001);
    }

    #[test]
    fn test_signed_64_bit_view() {
        let cell = Scratch::new(f64::from_bits(u64::MAX));
        assert_eq!(cell.as_i64(), -1);
        assert_eq!(cell.as_u64(), u64::MAX);
    }

    #[test]
    fn test_store_overwrites() {
        let mut cell = Scratch::new(1.5);
        cell.store(-0.0);
        assert_eq!(cell.u32_pair(), [0, 0x8000_0000]);
    }

    #[test]
    fn test_packed_slot_matches_view() {
        let packed = Packed::I16Quartet([-1, 2, -3, 4]);
        let cell = Scratch::new(packed.to_slot());
        assert_eq!(cell.packed(Transform::I16Quartet), Some(packed));
        assert_eq!(cell.packed(Transform::Identity), None);
    }

    #[test]
    fn test_f32_pair_packing() {
        let packed = Packed::F32Pair([0.5, -2.0]);
        assert_eq!(
            Scratch::new(packed.to_slot()).packed(packed.transform()),
            Some(packed)
        );
    }
}
