//! Niche encodings for the "failed" and "absent" states.
//!
//! A Result or Option return shares the slot with its payload by claiming
//! bit patterns the payload can never produce.  Which patterns are free
//! depends on the payload shape, so there are two mutually exclusive styles.

use crate::descriptor::Shape;
use crate::scratch::Scratch;

/// High word of the NaN pattern marking a scalar niche.
pub const NAN_HIGH_WORD: u32 = 0xfff8_0000;

/// Niche style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Niche {
    /// High word is [`NAN_HIGH_WORD`]; the low word is the niche value.
    /// Used for scalars, which never produce that NaN.
    HighBitsNaN,

    /// Low word is `1`; the high word is the niche value.
    /// Used for pointer-shaped payloads, whose aligned pointer is never 1.
    LowBitsOne,
}

/// Outcome of classifying a pair against a niche style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicheSignal {
    /// Not inside the niche: the slot carries a payload.
    Value,
    /// Niche value 0.
    Absent,
    /// Niche value is a pointer to a NUL-terminated UTF-8 message.
    Error(u32),
}

impl Niche {
    /// Style used by a payload shape.
    pub fn for_shape(shape: Shape) -> Self {
        if shape.is_pointer_shaped() {
            Self::LowBitsOne
        } else {
            Self::HighBitsNaN
        }
    }

    /// Encode a niche value (`0` = absent, otherwise an error pointer).
    pub fn encode(self, word: u32) -> f64 {
        let pair = match self {
            Self::HighBitsNaN => [word, NAN_HIGH_WORD],
            Self::LowBitsOne => [1, word],
        };
        crate::encode::pair(pair[0], pair[1])
    }

    /// Encode the absent state.
    pub fn absent(self) -> f64 {
        self.encode(0)
    }

    /// The niche value, if the pair lies inside this niche.
    pub fn niche_word(self, pair: [u32; 2]) -> Option<u32> {
        match self {
            Self::HighBitsNaN => (pair[1] == NAN_HIGH_WORD).then_some(pair[0]),
            Self::LowBitsOne => (pair[0] == 1).then_some(pair[1]),
        }
    }

    /// Pointer to the error message, if the pair encodes a failure.
    pub fn error_pointer(self, pair: [u32; 2]) -> Option<u32> {
        self.niche_word(pair).filter(|&word| word != 0)
    }

    /// Whether the pair encodes the absent state.
    pub fn is_absent(self, pair: [u32; 2]) -> bool {
        self.niche_word(pair) == Some(0)
    }

    pub fn classify(self, pair: [u32; 2]) -> NicheSignal {
        match self.niche_word(pair) {
            None => NicheSignal::Value,
            Some(0) => NicheSignal::Absent,
            Some(ptr) => NicheSignal::Error(ptr),
        }
    }

    /// Classify a raw slot value.
    pub fn classify_slot(self, slot: f64) -> NicheSignal {
        self.classify(Scratch::new(slot).u32_pair())
    }
}
