//! Values produced by wrapped exports.

use nichebind_abi::{ArrayKind, Packed};
use serde::Serialize;

use crate::error::{BridgeError, Result};

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

/// A decoded return value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A void export returned.
    Undefined,
    /// An Option export returned its absent state.
    Null,
    Number(f64),
    Bool(bool),
    BigUint(u64),
    BigInt(i64),
    /// A small array reinterpreted from the slot bits.
    Packed(Packed),
    /// Zero-copy alias of a linear-memory region.
    View(ArrayView),
    /// Array data copied out of linear memory.
    Array(TypedArray),
    String(String),
    Json(serde_json::Value),
    /// Decoded dynamic batch.
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Numeric value of `Number`, `BigUint` and `BigInt`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(x) => Some(*x),
            Self::BigUint(x) => Some(*x as f64),
            Self::BigInt(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&ArrayView> {
        match self {
            Self::View(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&TypedArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ArrayView
// ══════════════════════════════════════════════════════════════════════════════

/// A typed window onto linear memory.
///
/// The view stays readable only while linear memory keeps the size it had
/// when the view was created; growth detaches it.  Nothing tracks the
/// module reusing the region, so contents may change between reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrayView {
    kind: ArrayKind,
    offset: u32,
    len: u32,
    #[serde(skip)]
    memory_size: usize,
}

impl ArrayView {
    /// Validate a region against the current memory and create a view.
    pub(crate) fn new(kind: ArrayKind, offset: u32, len: u32, memory: &[u8]) -> Result<Self> {
        let width = kind.width();
        if width > 1 && offset as usize % width != 0 {
            return Err(BridgeError::Misaligned { kind, offset });
        }
        let end = (offset as usize).checked_add(len as usize * width);
        if end.map_or(true, |end| end > memory.len()) {
            return Err(BridgeError::OutOfBounds {
                kind,
                offset,
                len,
                memory_size: memory.len(),
            });
        }
        Ok(Self {
            kind,
            offset,
            len,
            memory_size: memory.len(),
        })
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    /// Byte offset in linear memory.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len as usize * self.kind.width()
    }

    /// Borrow the viewed bytes, failing if memory was resized since creation.
    pub(crate) fn bytes<'m>(&self, memory: &'m [u8]) -> Result<&'m [u8]> {
        if memory.len() != self.memory_size {
            return Err(BridgeError::DetachedView {
                was: self.memory_size,
                now: memory.len(),
            });
        }
        let start = self.offset as usize;
        Ok(&memory[start..start + self.byte_len()])
    }

    /// Copy the viewed elements out of memory.
    pub(crate) fn copy(&self, memory: &[u8]) -> Result<TypedArray> {
        let bytes = self.bytes(memory)?;
        Ok(TypedArray::from_le_bytes(self.kind, bytes))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TypedArray
// ══════════════════════════════════════════════════════════════════════════════

/// Array elements owned by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedArray {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
}

fn le<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

macro_rules! decode_le {
    ($bytes:expr, $ty:ty) => {
        $bytes
            .chunks_exact(std::mem::size_of::<$ty>())
            .map(|c| <$ty>::from_le_bytes(le(c)))
            .collect()
    };
}

impl TypedArray {
    /// Decode little-endian elements.  Trailing bytes short of one element
    /// are ignored; [`ArrayKind::None`] decodes as bytes.
    pub fn from_le_bytes(kind: ArrayKind, bytes: &[u8]) -> Self {
        match kind {
            ArrayKind::U8 | ArrayKind::None => Self::U8(bytes.to_vec()),
            ArrayKind::I8 => Self::I8(bytes.iter().map(|&b| b as i8).collect()),
            ArrayKind::U16 => Self::U16(decode_le!(bytes, u16)),
            ArrayKind::I16 => Self::I16(decode_le!(bytes, i16)),
            ArrayKind::U32 => Self::U32(decode_le!(bytes, u32)),
            ArrayKind::I32 => Self::I32(decode_le!(bytes, i32)),
            ArrayKind::F32 => Self::F32(decode_le!(bytes, f32)),
            ArrayKind::U64 => Self::U64(decode_le!(bytes, u64)),
            ArrayKind::I64 => Self::I64(decode_le!(bytes, i64)),
            ArrayKind::F64 => Self::F64(decode_le!(bytes, f64)),
        }
    }

    pub fn kind(&self) -> ArrayKind {
        match self {
            Self::U8(_) => ArrayKind::U8,
            Self::I8(_) => ArrayKind::I8,
            Self::U16(_) => ArrayKind::U16,
            Self::I16(_) => ArrayKind::I16,
            Self::U32(_) => ArrayKind::U32,
            Self::I32(_) => ArrayKind::I32,
            Self::F32(_) => ArrayKind::F32,
            Self::U64(_) => ArrayKind::U64,
            Self::I64(_) => ArrayKind::I64,
            Self::F64(_) => ArrayKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Vec<u8> {
        let mut mem = vec![0u8; 64];
        mem[8..12].copy_from_slice(&(-2i32).to_le_bytes());
        mem[12..16].copy_from_slice(&7i32.to_le_bytes());
        mem
    }

    #[test]
    fn test_view_reads_elements() {
        let mem = memory();
        let view = ArrayView::new(ArrayKind::I32, 8, 2, &mem).unwrap();
        assert_eq!(view.byte_len(), 8);
        assert_eq!(view.copy(&mem).unwrap(), TypedArray::I32(vec![-2, 7]));
    }

    #[test]
    fn test_view_bounds() {
        let mem = memory();
        let err = ArrayView::new(ArrayKind::F64, 56, 2, &mem).unwrap_err();
        assert!(matches!(err, BridgeError::OutOfBounds { offset: 56, len: 2, .. }));
        // Exactly at the end is fine.
        assert!(ArrayView::new(ArrayKind::F64, 56, 1, &mem).is_ok());
        assert!(ArrayView::new(ArrayKind::U8, 64, 0, &mem).is_ok());
    }

    #[test]
    fn test_view_alignment() {
        let mem = memory();
        let err = ArrayView::new(ArrayKind::U16, 3, 1, &mem).unwrap_err();
        assert_eq!(
            err.to_string(),
            "start offset of Uint16Array should be a multiple of 2, got 3"
        );
        assert!(ArrayView::new(ArrayKind::U8, 3, 1, &mem).is_ok());
    }

    #[test]
    fn test_view_detaches_on_resize() {
        let mut mem = memory();
        let view = ArrayView::new(ArrayKind::U8, 0, 4, &mem).unwrap();
        mem.resize(128, 0);
        assert!(matches!(
            view.bytes(&mem),
            Err(BridgeError::DetachedView { was: 64, now: 128 })
        ));
    }

    #[test]
    fn test_typed_array_decoding() {
        let bytes = 1.5f32
            .to_le_bytes()
            .into_iter()
            .chain((-3.0f32).to_le_bytes())
            .collect::<Vec<_>>();
        let arr = TypedArray::from_le_bytes(ArrayKind::F32, &bytes);
        assert_eq!(arr, TypedArray::F32(vec![1.5, -3.0]));
        assert_eq!(arr.kind(), ArrayKind::F32);
        assert_eq!(arr.len(), 2);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let v = Value::List(vec![
            Value::Null,
            Value::Number(2.5),
            Value::String("hi".into()),
            Value::Array(TypedArray::U16(vec![1, 2])),
        ]);
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"[null,2.5,"hi",[1,2]]"#
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::BigInt(-4).as_f64(), Some(-4.0));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert!(Value::Undefined.is_undefined());
        assert_eq!(Value::Number(1.0).as_str(), None);
    }
}
