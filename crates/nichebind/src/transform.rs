//! The transform table.
//!
//! One function per [`Transform`] index, looked up when an export's plan is
//! built.  Descriptors are validated first, so each function sees the
//! payload shape its transform accepts.

use nichebind_abi::{Packed, Scratch, Transform};

use crate::decode::{decode_dynamic, DecodeContext};
use crate::error::{BridgeError, Result};
use crate::value::{ArrayView, TypedArray, Value};

/// What a transform receives: the raw slot and, for pointer-shaped
/// descriptors, the materialised region.
pub(crate) struct Payload {
    pub slot: f64,
    pub region: Option<ArrayView>,
}

impl Payload {
    fn region(&self, transform: Transform) -> Result<ArrayView> {
        self.region.ok_or(BridgeError::ExpectedRegion(transform))
    }
}

pub(crate) type TransformFn = fn(Payload, &DecodeContext<'_>) -> Result<Value>;

/// Indexed by [`Transform::index`].
pub(crate) const TRANSFORMS: [TransformFn; Transform::COUNT] = [
    u8_octet,
    i8_octet,
    u16_quartet,
    i16_quartet,
    u32_pair,
    i32_pair,
    f32_pair,
    as_u64,
    as_i64,
    identity,
    void,
    boolean,
    string,
    dynamic,
    dynamic_batch,
    json,
];

pub(crate) fn lookup(transform: Transform) -> TransformFn {
    TRANSFORMS[transform.index()]
}

// ── Packed ──────────────────────────────────────────────────────────────────

macro_rules! packed_transform {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            fn $name(payload: Payload, _: &DecodeContext<'_>) -> Result<Value> {
                Ok(Value::Packed(Packed::$variant(Scratch::new(payload.slot).$name())))
            }
        )*
    };
}

packed_transform! {
    u8_octet => U8Octet,
    i8_octet => I8Octet,
    u16_quartet => U16Quartet,
    i16_quartet => I16Quartet,
    u32_pair => U32Pair,
    i32_pair => I32Pair,
    f32_pair => F32Pair,
}

// ── Scalars ─────────────────────────────────────────────────────────────────

fn as_u64(payload: Payload, _: &DecodeContext<'_>) -> Result<Value> {
    Ok(Value::BigUint(Scratch::new(payload.slot).as_u64()))
}

fn as_i64(payload: Payload, _: &DecodeContext<'_>) -> Result<Value> {
    Ok(Value::BigInt(Scratch::new(payload.slot).as_i64()))
}

fn identity(payload: Payload, _: &DecodeContext<'_>) -> Result<Value> {
    Ok(match payload.region {
        Some(view) => Value::View(view),
        None => Value::Number(payload.slot),
    })
}

fn void(_: Payload, _: &DecodeContext<'_>) -> Result<Value> {
    Ok(Value::Undefined)
}

// NaN is falsy.
fn boolean(payload: Payload, _: &DecodeContext<'_>) -> Result<Value> {
    Ok(Value::Bool(payload.slot != 0.0 && !payload.slot.is_nan()))
}

// ── Regions ─────────────────────────────────────────────────────────────────

fn string(payload: Payload, cx: &DecodeContext<'_>) -> Result<Value> {
    let bytes = payload.region(Transform::String)?.bytes(cx.memory)?;
    Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn json(payload: Payload, cx: &DecodeContext<'_>) -> Result<Value> {
    let bytes = payload.region(Transform::Json)?.bytes(cx.memory)?;
    Ok(Value::Json(serde_json::from_slice(bytes)?))
}

fn cells(view: ArrayView, cx: &DecodeContext<'_>) -> Result<Vec<f64>> {
    match view.copy(cx.memory)? {
        TypedArray::F64(cells) => Ok(cells),
        other => Err(BridgeError::MalformedDynamic(format!(
            "expected f64 cells, got {:?}",
            other.kind()
        ))),
    }
}

fn dynamic(payload: Payload, cx: &DecodeContext<'_>) -> Result<Value> {
    let cells = cells(payload.region(Transform::Dynamic)?, cx)?;
    match cells[..] {
        [value, descriptor] => decode_dynamic(value, descriptor, cx),
        _ => Err(BridgeError::MalformedDynamic(format!(
            "expected 2 cells, got {}",
            cells.len()
        ))),
    }
}

fn dynamic_batch(payload: Payload, cx: &DecodeContext<'_>) -> Result<Value> {
    let cells = cells(payload.region(Transform::DynamicBatch)?, cx)?;
    if cells.len() % 2 != 0 {
        return Err(BridgeError::MalformedDynamic(format!(
            "batch needs an even number of cells, got {}",
            cells.len()
        )));
    }
    cells
        .chunks_exact(2)
        .map(|pair| decode_dynamic(pair[0], pair[1], cx))
        .collect::<Result<Vec<_>>>()
        .map(Value::List)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WrapOptions;
    use nichebind_abi::{encode, ArrayKind, Descriptor};

    fn cx(memory: &[u8]) -> DecodeContext<'_> {
        DecodeContext::new(memory, WrapOptions::default())
    }

    fn scalar(slot: f64) -> Payload {
        Payload { slot, region: None }
    }

    fn write_cells(mem: &mut [u8], at: usize, cells: &[f64]) {
        for (i, c) in cells.iter().enumerate() {
            mem[at + i * 8..at + i * 8 + 8].copy_from_slice(&c.to_le_bytes());
        }
    }

    fn region(mem: &[u8], kind: ArrayKind, offset: u32, len: u32) -> Payload {
        let view = ArrayView::new(kind, offset, len, mem).unwrap();
        Payload {
            slot: encode::slice(offset, len),
            region: Some(view),
        }
    }

    #[test]
    fn test_table_matches_indices() {
        let mem = [0u8; 8];
        for t in Transform::ALL.iter().filter(|t| t.is_packed()) {
            let value = lookup(*t)(scalar(encode::pair(1, 2)), &cx(&mem)).unwrap();
            match value {
                Value::Packed(p) => assert_eq!(p.transform(), *t),
                other => panic!("{t:?} produced {other:?}"),
            }
        }
        let void = lookup(Transform::Void)(scalar(3.0), &cx(&mem)).unwrap();
        assert!(void.is_undefined());
    }

    #[test]
    fn test_packed_i16_quartet() {
        let mem = [0u8; 8];
        let slot = Packed::I16Quartet([-1, 2, -3, 4]).to_slot();
        let value = lookup(Transform::I16Quartet)(scalar(slot), &cx(&mem)).unwrap();
        assert_eq!(value, Value::Packed(Packed::I16Quartet([-1, 2, -3, 4])));
    }

    #[test]
    fn test_wide_integers() {
        let mem = [0u8; 8];
        let big = lookup(Transform::AsU64)(scalar(encode::u64(u64::MAX)), &cx(&mem)).unwrap();
        assert_eq!(big, Value::BigUint(u64::MAX));
        let neg = lookup(Transform::AsI64)(scalar(encode::i64(-7)), &cx(&mem)).unwrap();
        assert_eq!(neg, Value::BigInt(-7));
    }

    #[test]
    fn test_bool() {
        let mem = [0u8; 8];
        let b = |x| lookup(Transform::Bool)(scalar(x), &cx(&mem)).unwrap();
        assert_eq!(b(1.0), Value::Bool(true));
        assert_eq!(b(0.0), Value::Bool(false));
        assert_eq!(b(f64::NAN), Value::Bool(false));
    }

    #[test]
    fn test_string_is_lossy() {
        let mut mem = vec![0u8; 32];
        mem[8..13].copy_from_slice(b"h\xffi!!");
        let value = string(region(&mem, ArrayKind::U8, 8, 3), &cx(&mem)).unwrap();
        assert_eq!(value, Value::String("h\u{fffd}i".into()));
    }

    #[test]
    fn test_string_without_region_fails() {
        let mem = [0u8; 8];
        assert!(matches!(
            string(scalar(0.0), &cx(&mem)),
            Err(BridgeError::ExpectedRegion(Transform::String))
        ));
    }

    #[test]
    fn test_json() {
        let mut mem = vec![0u8; 64];
        let text = br#"{"a":[1,2]}"#;
        mem[16..16 + text.len()].copy_from_slice(text);
        let value = json(region(&mem, ArrayKind::U8, 16, text.len() as u32), &cx(&mem)).unwrap();
        assert_eq!(value, Value::Json(serde_json::json!({"a": [1, 2]})));
    }

    #[test]
    fn test_dynamic_rejects_wrong_length() {
        let mut mem = vec![0u8; 64];
        write_cells(&mut mem, 0, &[1.0, 2.0, 3.0]);
        let err = dynamic(region(&mem, ArrayKind::F64, 0, 3), &cx(&mem)).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedDynamic(_)));
        let err = dynamic_batch(region(&mem, ArrayKind::F64, 0, 3), &cx(&mem)).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedDynamic(_)));
    }

    #[test]
    fn test_dynamic_batch_decodes_each_pair() {
        let mut mem = vec![0u8; 64];
        write_cells(
            &mut mem,
            0,
            &[
                2.5,
                Descriptor::scalar(Transform::Identity).to_slot(),
                1.0,
                Descriptor::scalar(Transform::Bool).to_slot(),
            ],
        );
        let value = dynamic_batch(region(&mem, ArrayKind::F64, 0, 4), &cx(&mem)).unwrap();
        assert_eq!(value, Value::List(vec![Value::Number(2.5), Value::Bool(true)]));
    }

    #[test]
    fn test_empty_batch() {
        let mem = vec![0u8; 16];
        let value = dynamic_batch(region(&mem, ArrayKind::F64, 8, 0), &cx(&mem)).unwrap();
        assert_eq!(value, Value::List(vec![]));
    }
}
