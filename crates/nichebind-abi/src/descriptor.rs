//! Type descriptors: the per-export byte octet telling the host how to decode
//! a returned slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;
use crate::scratch::Scratch;

/// Suffix marking the descriptor companion of an export.
pub const INFO_SUFFIX: &str = "_info_";

// ══════════════════════════════════════════════════════════════════════════════
// ArrayKind
// ══════════════════════════════════════════════════════════════════════════════

/// Element kind of an array payload.
///
/// Discriminants are part of the wire format and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ArrayKind {
    U8 = 0,
    I8 = 1,
    U16 = 2,
    I16 = 3,
    U32 = 4,
    I32 = 5,
    F32 = 6,
    U64 = 7,
    I64 = 8,
    F64 = 9,
    None = 10,
}

impl ArrayKind {
    /// Every kind, in wire order.
    pub const ALL: [ArrayKind; 11] = [
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::F32,
        Self::U64,
        Self::I64,
        Self::F64,
        Self::None,
    ];

    pub fn from_index(index: u8) -> Result<Self, DescriptorError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(DescriptorError::UnknownArrayKind(index))
    }

    /// Width of one element in bytes (0 for [`ArrayKind::None`]).
    pub fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
            Self::None => 0,
        }
    }

    /// Name of the equivalent typed-array constructor, used in diagnostics.
    pub fn typed_array_name(self) -> &'static str {
        match self {
            Self::U8 => "Uint8Array",
            Self::I8 => "Int8Array",
            Self::U16 => "Uint16Array",
            Self::I16 => "Int16Array",
            Self::U32 => "Uint32Array",
            Self::I32 => "Int32Array",
            Self::F32 => "Float32Array",
            Self::U64 => "BigUint64Array",
            Self::I64 => "BigInt64Array",
            Self::F64 => "Float64Array",
            Self::None => "none",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Transform
// ══════════════════════════════════════════════════════════════════════════════

/// Output-shaping step applied as the last decoding stage.
///
/// The packed transforms share discriminants with the matching
/// [`ArrayKind`] so the two tables line up index-for-index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Transform {
    U8Octet = ArrayKind::U8 as u8,
    I8Octet = ArrayKind::I8 as u8,
    U16Quartet = ArrayKind::U16 as u8,
    I16Quartet = ArrayKind::I16 as u8,
    U32Pair = ArrayKind::U32 as u8,
    I32Pair = ArrayKind::I32 as u8,
    F32Pair = ArrayKind::F32 as u8,
    AsU64 = ArrayKind::U64 as u8,
    AsI64 = ArrayKind::I64 as u8,
    Identity = 9,
    Void = 10,
    Bool = 11,
    String = 12,
    Dynamic = 13,
    DynamicBatch = 14,
    Json = 15,
}

impl Transform {
    /// Number of entries in the transform table.
    pub const COUNT: usize = 16;

    /// Every transform, in table order.
    pub const ALL: [Transform; Self::COUNT] = [
        Self::U8Octet,
        Self::I8Octet,
        Self::U16Quartet,
        Self::I16Quartet,
        Self::U32Pair,
        Self::I32Pair,
        Self::F32Pair,
        Self::AsU64,
        Self::AsI64,
        Self::Identity,
        Self::Void,
        Self::Bool,
        Self::String,
        Self::Dynamic,
        Self::DynamicBatch,
        Self::Json,
    ];

    pub fn from_index(index: u8) -> Result<Self, DescriptorError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(DescriptorError::UnknownTransform(index))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The seven transforms that reinterpret the slot as a small packed array.
    pub fn is_packed(self) -> bool {
        (self as u8) < 7
    }

    /// Whether this transform accepts a payload of the given shape.
    pub fn accepts(self, shape: Shape) -> bool {
        match self {
            Self::Identity => matches!(shape, Shape::Scalar | Shape::Array),
            Self::String | Self::Json => shape == Shape::Array,
            Self::Dynamic | Self::DynamicBatch => shape == Shape::Dynamic,
            _ => shape == Shape::Scalar,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Shape
// ══════════════════════════════════════════════════════════════════════════════

/// Payload shape. Exactly one is active per descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// The slot itself is the value.
    Scalar,
    /// The slot is a `(offset, length)` pair over linear memory.
    Array,
    /// The slot is a `(offset, length)` pair over `(value, descriptor)` f64s.
    Dynamic,
}

impl Shape {
    /// Array and dynamic payloads carry a pointer in the first word.
    pub fn is_pointer_shaped(self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Array => write!(f, "array"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Descriptor
// ══════════════════════════════════════════════════════════════════════════════

/// Decoded type descriptor of one export (or of one dynamic value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub is_result: bool,
    pub is_option: bool,
    pub shape: Shape,
    pub array_kind: ArrayKind,
    pub transform: Transform,
}

impl Descriptor {
    // ── Builders (encoding side) ─────────────────────────────────────────

    /// A scalar payload shaped by `transform`.
    pub fn scalar(transform: Transform) -> Self {
        Self {
            is_result: false,
            is_option: false,
            shape: Shape::Scalar,
            array_kind: ArrayKind::None,
            transform,
        }
    }

    /// An array payload of `kind` elements, returned as a view.
    pub fn array(kind: ArrayKind) -> Self {
        Self {
            is_result: false,
            is_option: false,
            shape: Shape::Array,
            array_kind: kind,
            transform: Transform::Identity,
        }
    }

    /// UTF-8 text carried as a byte array.
    pub fn string() -> Self {
        Self {
            transform: Transform::String,
            ..Self::array(ArrayKind::U8)
        }
    }

    /// JSON text carried as a byte array.
    pub fn json() -> Self {
        Self {
            transform: Transform::Json,
            ..Self::array(ArrayKind::U8)
        }
    }

    /// A self-describing payload; `batch` selects the sequence variant.
    pub fn dynamic(batch: bool) -> Self {
        Self {
            is_result: false,
            is_option: false,
            shape: Shape::Dynamic,
            array_kind: ArrayKind::F64,
            transform: if batch {
                Transform::DynamicBatch
            } else {
                Transform::Dynamic
            },
        }
    }

    pub fn result(self) -> Self {
        Self {
            is_result: true,
            ..self
        }
    }

    pub fn option(self) -> Self {
        Self {
            is_option: true,
            ..self
        }
    }

    pub fn with_transform(self, transform: Transform) -> Self {
        Self { transform, ..self }
    }

    pub fn identity(self) -> Self {
        self.with_transform(Transform::Identity)
    }

    // ── Wire format ──────────────────────────────────────────────────────

    /// Pack into the descriptor octet.
    pub fn to_octet(self) -> [u8; 8] {
        [
            self.is_result as u8,
            self.is_option as u8,
            (self.shape == Shape::Array) as u8,
            self.array_kind as u8,
            self.transform as u8,
            (self.shape == Shape::Dynamic) as u8,
            0,
            0,
        ]
    }

    /// Pack into the `f64` slot returned by an `_info_` export.
    pub fn to_slot(self) -> f64 {
        Scratch::from_bytes(self.to_octet()).as_f64()
    }

    /// Decode and validate a descriptor octet.
    pub fn from_octet(octet: [u8; 8]) -> Result<Self, DescriptorError> {
        let [is_result, is_option, is_array, array_kind, transform, is_dynamic, _, _] = octet;
        let shape = match (is_array != 0, is_dynamic != 0) {
            (true, true) => return Err(DescriptorError::ConflictingShape),
            (true, false) => Shape::Array,
            (false, true) => Shape::Dynamic,
            (false, false) => Shape::Scalar,
        };
        let descriptor = Self {
            is_result: is_result != 0,
            is_option: is_option != 0,
            shape,
            array_kind: ArrayKind::from_index(array_kind)?,
            transform: Transform::from_index(transform)?,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Decode and validate the slot returned by an `_info_` export.
    pub fn from_slot(slot: f64) -> Result<Self, DescriptorError> {
        Self::from_octet(Scratch::new(slot).u8_octet())
    }

    /// Check that the transform fits the payload shape.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.shape == Shape::Array && self.array_kind == ArrayKind::None {
            return Err(DescriptorError::MissingElementKind);
        }
        if !self.transform.accepts(self.shape) {
            return Err(DescriptorError::TransformShapeMismatch {
                transform: self.transform,
                shape: self.shape,
            });
        }
        Ok(())
    }

    /// Element kind of the region the payload points at, if pointer-shaped.
    ///
    /// Dynamic payloads always point at `f64` cells.
    pub fn region_kind(&self) -> Option<ArrayKind> {
        match self.shape {
            Shape::Scalar => None,
            Shape::Array => Some(self.array_kind),
            Shape::Dynamic => Some(ArrayKind::F64),
        }
    }

    /// Whether the slot must be split into a pair before decoding.
    pub fn needs_pair(&self) -> bool {
        self.is_result || self.is_option || self.shape.is_pointer_shaped()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shape)?;
        if self.shape == Shape::Array {
            write!(f, "<{}>", self.array_kind.typed_array_name())?;
        }
        write!(f, " -> {:?}", self.transform)?;
        if self.is_option {
            write!(f, " ?")?;
        }
        if self.is_result {
            write!(f, " !")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octet_layout() {
        let d = Descriptor::array(ArrayKind::I16).option().result();
        assert_eq!(d.to_octet(), [1, 1, 1, 3, 9, 0, 0, 0]);

        let d = Descriptor::dynamic(true);
        assert_eq!(d.to_octet(), [0, 0, 0, 9, 14, 1, 0, 0]);
    }

    #[test]
    fn test_slot_decodes_back() {
        let d = Descriptor::string().result();
        assert_eq!(Descriptor::from_slot(d.to_slot()), Ok(d));
    }

    #[test]
    fn test_packed_transforms_share_array_kind_indices() {
        for kind in &ArrayKind::ALL[..7] {
            let t = Transform::from_index(*kind as u8).unwrap();
            assert!(t.is_packed());
        }
        assert!(!Transform::AsU64.is_packed());
        assert_eq!(Transform::AsI64 as u8, ArrayKind::I64 as u8);
    }

    #[test]
    fn test_unknown_indices_rejected() {
        assert_eq!(
            Descriptor::from_octet([0, 0, 0, 11, 9, 0, 0, 0]),
            Err(DescriptorError::UnknownArrayKind(11))
        );
        assert_eq!(
            Descriptor::from_octet([0, 0, 0, 10, 16, 0, 0, 0]),
            Err(DescriptorError::UnknownTransform(16))
        );
    }

    #[test]
    fn test_array_and_dynamic_conflict() {
        assert_eq!(
            Descriptor::from_octet([0, 0, 1, 9, 13, 1, 0, 0]),
            Err(DescriptorError::ConflictingShape)
        );
    }

    #[test]
    fn test_transform_shape_mismatch() {
        // Text decoding needs bytes to decode.
        let err = Descriptor::from_octet([0, 0, 0, 10, 12, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::TransformShapeMismatch {
                transform: Transform::String,
                shape: Shape::Scalar,
            }
        );
        // Bool coercion of an array makes no sense.
        assert!(Descriptor::from_octet([0, 0, 1, 0, 11, 0, 0, 0]).is_err());
        // Dynamic transform without the dynamic flag.
        assert!(Descriptor::from_octet([0, 0, 1, 9, 13, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_array_needs_element_kind() {
        assert_eq!(
            Descriptor::from_octet([0, 0, 1, 10, 9, 0, 0, 0]),
            Err(DescriptorError::MissingElementKind)
        );
    }

    #[test]
    fn test_region_kind() {
        assert_eq!(Descriptor::scalar(Transform::Identity).region_kind(), None);
        assert_eq!(
            Descriptor::array(ArrayKind::U32).region_kind(),
            Some(ArrayKind::U32)
        );
        assert_eq!(Descriptor::dynamic(false).region_kind(), Some(ArrayKind::F64));
    }

    #[test]
    fn test_needs_pair() {
        assert!(!Descriptor::scalar(Transform::Identity).needs_pair());
        assert!(Descriptor::scalar(Transform::Identity).option().needs_pair());
        assert!(Descriptor::array(ArrayKind::U8).needs_pair());
    }

    #[test]
    fn test_display() {
        let d = Descriptor::array(ArrayKind::F32).result();
        assert_eq!(d.to_string(), "array<Float32Array> -> Identity !");
    }

    #[test]
    fn test_serialize_descriptor() {
        let json = serde_json::to_value(Descriptor::string()).unwrap();
        assert_eq!(json["shape"], "array");
        assert_eq!(json["transform"], "string");
        assert_eq!(json["array_kind"], "u8");
    }
}
