//! Niche decoders and per-descriptor decoding plans.
//!
//! A [`Plan`] is built once per export from its descriptor and holds only
//! the stages that descriptor needs: the Result check, the Option check,
//! region materialisation, the transform, and the defensive copy.  Stages a
//! descriptor does not use are absent from the plan rather than skipped by a
//! runtime branch on the descriptor.

use nichebind_abi::{ArrayKind, Descriptor, DescriptorError, Niche, Scratch};

use crate::error::{BridgeError, Result};
use crate::options::WrapOptions;
use crate::transform::{self, Payload, TransformFn};
use crate::value::{ArrayView, Value};

/// How many dynamic payloads may nest inside one another.
pub(crate) const MAX_DYNAMIC_DEPTH: usize = 32;

/// State shared by every stage of one decode.
pub(crate) struct DecodeContext<'a> {
    /// Linear memory as it is right after the call returned.
    pub memory: &'a [u8],
    pub options: WrapOptions,
    /// Number of dynamic payloads enclosing the value being decoded.
    pub depth: usize,
}

impl<'a> DecodeContext<'a> {
    pub(crate) fn new(memory: &'a [u8], options: WrapOptions) -> Self {
        Self {
            memory,
            options,
            depth: 0,
        }
    }

    fn nested(&self) -> Result<Self> {
        if self.depth >= MAX_DYNAMIC_DEPTH {
            return Err(BridgeError::DynamicTooDeep(MAX_DYNAMIC_DEPTH));
        }
        Ok(Self {
            memory: self.memory,
            options: self.options,
            depth: self.depth + 1,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Niche decoders
// ══════════════════════════════════════════════════════════════════════════════

/// Fails with the module's message when the pair encodes an error.
pub(crate) type ResultCheck = fn([u32; 2], &[u8]) -> Result<()>;

/// Reports whether the pair encodes the absent state.
pub(crate) type OptionCheck = fn([u32; 2]) -> bool;

fn try_result_high_bits_nan(pair: [u32; 2], memory: &[u8]) -> Result<()> {
    match Niche::HighBitsNaN.error_pointer(pair) {
        Some(ptr) => Err(BridgeError::Failed(c_string(memory, ptr)?)),
        None => Ok(()),
    }
}

fn try_result_low_bits_one(pair: [u32; 2], memory: &[u8]) -> Result<()> {
    match Niche::LowBitsOne.error_pointer(pair) {
        Some(ptr) => Err(BridgeError::Failed(c_string(memory, ptr)?)),
        None => Ok(()),
    }
}

fn try_option_high_bits_nan(pair: [u32; 2]) -> bool {
    Niche::HighBitsNaN.is_absent(pair)
}

fn try_option_low_bits_one(pair: [u32; 2]) -> bool {
    Niche::LowBitsOne.is_absent(pair)
}

pub(crate) fn try_result(niche: Niche) -> ResultCheck {
    match niche {
        Niche::HighBitsNaN => try_result_high_bits_nan,
        Niche::LowBitsOne => try_result_low_bits_one,
    }
}

pub(crate) fn try_option(niche: Niche) -> OptionCheck {
    match niche {
        Niche::HighBitsNaN => try_option_high_bits_nan,
        Niche::LowBitsOne => try_option_low_bits_one,
    }
}

/// Read a NUL-terminated UTF-8 string starting at `ptr`.
///
/// Without a terminator the string runs to the end of memory.  Invalid
/// UTF-8 is replaced, not rejected.
pub(crate) fn c_string(memory: &[u8], ptr: u32) -> Result<String> {
    let tail = memory
        .get(ptr as usize..)
        .ok_or(BridgeError::OutOfBounds {
            kind: ArrayKind::U8,
            offset: ptr,
            len: 0,
            memory_size: memory.len(),
        })?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

// ══════════════════════════════════════════════════════════════════════════════
// Plan
// ══════════════════════════════════════════════════════════════════════════════

/// The decoding steps one descriptor requires, fixed at construction.
#[derive(Clone)]
pub(crate) struct Plan {
    descriptor: Descriptor,
    needs_pair: bool,
    try_result: Option<ResultCheck>,
    try_option: Option<OptionCheck>,
    region: Option<ArrayKind>,
    transform: TransformFn,
    copy_out: bool,
}

impl Plan {
    pub(crate) fn new(
        descriptor: Descriptor,
        options: WrapOptions,
    ) -> std::result::Result<Self, DescriptorError> {
        descriptor.validate()?;
        let niche = Niche::for_shape(descriptor.shape);
        let region = descriptor.region_kind();
        let is_identity_array =
            region.is_some() && descriptor.transform == nichebind_abi::Transform::Identity;
        Ok(Self {
            descriptor,
            needs_pair: descriptor.needs_pair(),
            try_result: descriptor.is_result.then(|| try_result(niche)),
            try_option: descriptor.is_option.then(|| try_option(niche)),
            region,
            transform: transform::lookup(descriptor.transform),
            copy_out: options.always_copy_data
                && (descriptor.transform.is_packed() || is_identity_array),
        })
    }

    pub(crate) fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Whether array results are copied out of linear memory.
    pub(crate) fn copies_out(&self) -> bool {
        self.copy_out
    }

    /// Run the plan over one returned slot.
    ///
    /// The Result check runs strictly before the Option check, so a failure
    /// is never mistaken for an absent value.
    pub(crate) fn decode(&self, slot: f64, cx: &DecodeContext<'_>) -> Result<Value> {
        let pair = if self.needs_pair {
            Scratch::new(slot).u32_pair()
        } else {
            [0, 0]
        };
        if let Some(check) = self.try_result {
            check(pair, cx.memory)?;
        }
        if let Some(is_absent) = self.try_option {
            if is_absent(pair) {
                return Ok(Value::Null);
            }
        }
        let region = match self.region {
            Some(kind) => Some(ArrayView::new(kind, pair[0], pair[1], cx.memory)?),
            None => None,
        };
        let value = (self.transform)(Payload { slot, region }, cx)?;
        if self.copy_out {
            if let Value::View(view) = value {
                return Ok(Value::Array(view.copy(cx.memory)?));
            }
        }
        Ok(value)
    }
}

/// Decode a `(value, descriptor)` cell pair from a dynamic payload.
///
/// Each level of nesting counts toward [`MAX_DYNAMIC_DEPTH`], so a payload
/// that refers back to its own cells fails instead of recursing forever.
pub(crate) fn decode_dynamic(
    slot: f64,
    descriptor_slot: f64,
    cx: &DecodeContext<'_>,
) -> Result<Value> {
    let cx = cx.nested()?;
    let invalid = |source: DescriptorError| BridgeError::InvalidDescriptor {
        name: "dynamic value".to_string(),
        source,
    };
    let descriptor = Descriptor::from_slot(descriptor_slot).map_err(invalid)?;
    let plan = Plan::new(descriptor, cx.options).map_err(invalid)?;
    plan.decode(slot, &cx)
}
