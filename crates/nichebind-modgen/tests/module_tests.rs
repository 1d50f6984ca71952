//! Integration tests for module assembly.
//!
//! Structure is checked with wasmparser; behaviour by running the module
//! under wasmi.

use nichebind_abi::{encode, ArrayKind, Descriptor, Transform, NAN_HIGH_WORD};
use nichebind_modgen::types::{CUSTOM_SECTION_NAME, DATA_START, GENERATOR_VERSION, PAGE_SIZE};
use nichebind_modgen::{Body, Effect, ModgenError, ModuleBuilder, Ret, ValType};
use wasmi::{Engine, Linker, Module, Store};
use wasmparser::{ExternalKind, Payload};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn get_exports(wasm: &[u8]) -> Vec<(String, ExternalKind)> {
    let parser = wasmparser::Parser::new(0);
    let mut exports = Vec::new();
    for payload in parser.parse_all(wasm) {
        if let Ok(Payload::ExportSection(reader)) = payload {
            for export in reader {
                let exp = export.unwrap();
                exports.push((exp.name.to_string(), exp.kind));
            }
        }
    }
    exports
}

fn custom_section(wasm: &[u8], name: &str) -> Option<Vec<u8>> {
    wasmparser::Parser::new(0)
        .parse_all(wasm)
        .find_map(|payload| match payload {
            Ok(Payload::CustomSection(reader)) if reader.name() == name => {
                Some(reader.data().to_vec())
            }
            _ => None,
        })
}

fn instantiate(wasm: &[u8]) -> (Store<()>, wasmi::Instance) {
    let engine = Engine::default();
    let module = Module::new(&engine, wasm).expect("failed to parse wasm module");
    let mut store = Store::new(&engine, ());
    let linker = Linker::<()>::new(&engine);
    let instance = linker
        .instantiate(&mut store, &module)
        .expect("failed to instantiate")
        .start(&mut store)
        .expect("failed to start instance");
    (store, instance)
}

fn call0(store: &mut Store<()>, instance: &wasmi::Instance, name: &str) -> f64 {
    instance
        .get_typed_func::<(), f64>(&*store, name)
        .unwrap_or_else(|_| panic!("{name} export missing"))
        .call(&mut *store, ())
        .unwrap_or_else(|e| panic!("{name} trapped: {e}"))
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Structure
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_exports_functions_info_and_memory() {
    let mut b = ModuleBuilder::new();
    b.function(
        "len",
        &[ValType::I32],
        Body::returning(Ret::Param(0)),
        Descriptor::scalar(Transform::Identity),
    );
    b.raw_function("helper", &[], Body::returning(Ret::None));
    let wasm = b.finish().unwrap();

    let exports = get_exports(&wasm);
    let names: Vec<&str> = exports.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["len", "len_info_", "helper", "memory"]);
    assert!(exports
        .iter()
        .any(|(n, k)| n == "memory" && *k == ExternalKind::Memory));
    assert!(exports
        .iter()
        .filter(|(n, _)| n != "memory")
        .all(|(_, k)| *k == ExternalKind::Func));
}

#[test]
fn test_custom_section_carries_version() {
    let wasm = ModuleBuilder::new().finish().unwrap();
    let data = custom_section(&wasm, CUSTOM_SECTION_NAME).expect("custom section missing");
    assert_eq!(data, GENERATOR_VERSION.as_bytes());
}

#[test]
fn test_param_out_of_range() {
    let mut b = ModuleBuilder::new();
    b.raw_function("f", &[ValType::F64], Body::returning(Ret::Param(1)));
    let err = b.finish().unwrap_err();
    assert!(matches!(
        &err,
        ModgenError::ParamOutOfRange { function, index: 1, count: 1 } if function == "f"
    ));
    assert_eq!(err.to_string(), "f: parameter 1 out of range (1 declared)");
}

#[test]
fn test_info_name_collision() {
    let mut b = ModuleBuilder::new();
    b.raw_function("f_info_", &[], Body::constant(0.0));
    b.function(
        "f",
        &[],
        Body::constant(0.0),
        Descriptor::scalar(Transform::Void),
    );
    assert!(matches!(b.finish(), Err(ModgenError::DuplicateExport(n)) if n == "f_info_"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Execution via wasmi
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_info_returns_descriptor_slot() {
    let d = Descriptor::array(ArrayKind::I16).result().option();
    let mut b = ModuleBuilder::new();
    b.function("shorts", &[], Body::constant(encode::slice(DATA_START, 0)), d);
    let wasm = b.finish().unwrap();
    let (mut store, instance) = instantiate(&wasm);

    let slot = call0(&mut store, &instance, "shorts_info_");
    assert_eq!(Descriptor::from_slot(slot).unwrap(), d);
}

#[test]
fn test_nan_payload_preserved() {
    let slot = encode::pair(DATA_START, NAN_HIGH_WORD);
    let mut b = ModuleBuilder::new();
    b.raw_function("fail", &[], Body::constant(slot));
    let wasm = b.finish().unwrap();
    let (mut store, instance) = instantiate(&wasm);

    let got = call0(&mut store, &instance, "fail");
    assert_eq!(got.to_bits(), slot.to_bits());
}

#[test]
fn test_sum_widens_each_param() {
    let mut b = ModuleBuilder::new();
    b.raw_function(
        "sum",
        &[ValType::I32, ValType::F32, ValType::F64],
        Body::returning(Ret::SumParams),
    );
    let wasm = b.finish().unwrap();
    let (mut store, instance) = instantiate(&wasm);

    let sum = instance
        .get_typed_func::<(i32, f32, f64), f64>(&store, "sum")
        .unwrap();
    assert_eq!(sum.call(&mut store, (-2, 0.5, 10.0)).unwrap(), 8.5);
}

#[test]
fn test_i64_param_reinterpreted() {
    let mut b = ModuleBuilder::new();
    b.raw_function("bits", &[ValType::I64], Body::returning(Ret::Param(0)));
    let wasm = b.finish().unwrap();
    let (mut store, instance) = instantiate(&wasm);

    let bits = instance
        .get_typed_func::<i64, f64>(&store, "bits")
        .unwrap();
    let got = bits.call(&mut store, -1).unwrap();
    assert_eq!(got.to_bits(), u64::MAX);
}

#[test]
fn test_effects_run_in_order() {
    let mut b = ModuleBuilder::new();
    b.raw_function(
        "touch",
        &[],
        Body::returning(Ret::None)
            .after(Effect::IncrementU32(0))
            .after(Effect::IncrementU32(0))
            .after(Effect::StoreU8 { offset: 8, value: 0xab })
            .after(Effect::Grow(2)),
    );
    let wasm = b.finish().unwrap();
    let (mut store, instance) = instantiate(&wasm);
    let memory = instance.get_memory(&store, "memory").unwrap();

    instance
        .get_typed_func::<(), ()>(&store, "touch")
        .unwrap()
        .call(&mut store, ())
        .unwrap();

    let data = memory.data(&store);
    assert_eq!(data.len(), 3 * PAGE_SIZE as usize);
    assert_eq!(u32::from_le_bytes(data[0..4].try_into().unwrap()), 2);
    assert_eq!(data[8], 0xab);
}

#[test]
fn test_data_segment_placed() {
    let mut b = ModuleBuilder::new();
    let msg = b.cstring("bad input");
    let cells = b.f64s(&[1.5, -2.0]);
    let wasm = b.finish().unwrap();
    let (store, instance) = instantiate(&wasm);
    let data = instance.get_memory(&store, "memory").unwrap().data(&store);

    assert_eq!(&data[msg as usize..msg as usize + 10], b"bad input\0");
    let second = &data[cells as usize + 8..cells as usize + 16];
    assert_eq!(f64::from_le_bytes(second.try_into().unwrap()), -2.0);
}
