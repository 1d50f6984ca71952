//! Export discovery and wrapped calls.
//!
//! [`Bindings`] owns an instantiated module.  At construction it pairs every
//! `<name>_info_` export with its raw `<name>` export, reads the descriptor
//! once, and builds a decoding [`Plan`] for it.  Calls then run only the
//! steps that plan holds.

use std::collections::HashMap;

use log::{debug, trace, warn};
use nichebind_abi::{Descriptor, DescriptorError, INFO_SUFFIX};
use wasmi::core::ValType;
use wasmi::{Engine, Func, Instance, Linker, Memory, Module, Store, Val};

use crate::args::Arg;
use crate::decode::{DecodeContext, Plan};
use crate::error::{BridgeError, Result};
use crate::options::WrapOptions;
use crate::value::{ArrayView, TypedArray, Value};

// ══════════════════════════════════════════════════════════════════════════════
// ExportFn
// ══════════════════════════════════════════════════════════════════════════════

/// One synthesized wrapper: the raw export plus its decoding plan.
#[derive(Clone)]
pub struct ExportFn {
    name: String,
    func: Func,
    params: Vec<ValType>,
    results: Vec<ValType>,
    plan: Plan,
}

impl ExportFn {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter count of the raw export.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ValType] {
        &self.params
    }

    pub fn descriptor(&self) -> &Descriptor {
        self.plan.descriptor()
    }

    /// Whether array results of this export are copied out of linear memory.
    pub fn copies_out(&self) -> bool {
        self.plan.copies_out()
    }
}

impl std::fmt::Debug for ExportFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportFn")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("descriptor", self.plan.descriptor())
            .field("copies_out", &self.plan.copies_out())
            .finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════════════════════

/// A wrapped module instance.
pub struct Bindings<T = ()> {
    store: Store<T>,
    instance: Instance,
    memory: Memory,
    options: WrapOptions,
    exports: Vec<ExportFn>,
    index: HashMap<String, usize>,
}

impl Bindings<()> {
    /// Compile, instantiate and wrap a module that has no imports.
    pub fn instantiate(wasm: &[u8], options: WrapOptions) -> Result<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, wasm)?;
        let mut store = Store::new(&engine, ());
        let linker = Linker::<()>::new(&engine);
        let instance = linker.instantiate(&mut store, &module)?.start(&mut store)?;
        Self::wrap(store, instance, options)
    }
}

impl<T> Bindings<T> {
    /// Wrap an already-instantiated module.
    ///
    /// Fails if the module has no `memory` export or if any descriptor is
    /// invalid.  `_info_` exports without a matching raw export are skipped.
    pub fn wrap(mut store: Store<T>, instance: Instance, options: WrapOptions) -> Result<Self> {
        let memory = instance
            .get_memory(&store, "memory")
            .ok_or(BridgeError::MissingMemory)?;

        let funcs: Vec<(String, Func)> = instance
            .exports(&store)
            .filter_map(|export| {
                let name = export.name().to_string();
                export.into_func().map(|func| (name, func))
            })
            .collect();
        let by_name: HashMap<&str, Func> = funcs.iter().map(|(n, f)| (n.as_str(), *f)).collect();

        let mut exports = Vec::new();
        let mut index = HashMap::new();
        for (info_name, info) in &funcs {
            let Some(name) = info_name.strip_suffix(INFO_SUFFIX) else {
                continue;
            };
            let Some(&func) = by_name.get(name) else {
                warn!("skipping {info_name}: no export named `{name}`");
                continue;
            };

            let info_ty = info.ty(&store);
            let slot = invoke(&mut store, *info, info_ty.params(), info_ty.results(), &[])?;
            let invalid = |source: DescriptorError| BridgeError::InvalidDescriptor {
                name: name.to_string(),
                source,
            };
            let descriptor = Descriptor::from_slot(slot).map_err(invalid)?;
            let plan = Plan::new(descriptor, options).map_err(invalid)?;

            let ty = func.ty(&store);
            let export = ExportFn {
                name: name.to_string(),
                func,
                params: ty.params().to_vec(),
                results: ty.results().to_vec(),
                plan,
            };
            debug!(
                "wrapped {} (arity {}): {}",
                export.name,
                export.arity(),
                descriptor
            );
            index.insert(export.name.clone(), exports.len());
            exports.push(export);
        }

        Ok(Self {
            store,
            instance,
            memory,
            options,
            exports,
            index,
        })
    }

    // ── Calls ───────────────────────────────────────────────────────────────

    /// Call a wrapped export and decode its result.
    ///
    /// The argument count must equal the raw export's arity; otherwise the
    /// export is not invoked.
    pub fn call(&mut self, name: &str, args: &[Arg]) -> Result<Value> {
        let export = self
            .index
            .get(name)
            .map(|&i| &self.exports[i])
            .ok_or_else(|| BridgeError::UnknownExport(name.to_string()))?;
        if args.len() != export.params.len() {
            return Err(BridgeError::ArgumentCount {
                name: export.name.clone(),
                expected: export.params.len(),
                got: args.len(),
            });
        }

        let slot = invoke(&mut self.store, export.func, &export.params, &export.results, args)?;
        trace!("{name}{args:?} -> {slot:?} ({:#018x})", slot.to_bits());

        let cx = DecodeContext::new(self.memory.data(&self.store), self.options);
        export.plan.decode(slot, &cx)
    }

    /// Call any function export directly and return its raw slot, bypassing
    /// decoding and the arity check beyond what the runtime enforces.
    pub fn call_raw(&mut self, name: &str, args: &[Arg]) -> Result<f64> {
        let func = self
            .instance
            .get_func(&self.store, name)
            .ok_or_else(|| BridgeError::UnknownExport(name.to_string()))?;
        let ty = func.ty(&self.store);
        invoke(&mut self.store, func, ty.params(), ty.results(), args)
    }

    // ── Introspection ───────────────────────────────────────────────────────

    /// Wrapped exports in module export order.
    pub fn functions(&self) -> impl Iterator<Item = &ExportFn> {
        self.exports.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|e| e.name())
    }

    pub fn get(&self, name: &str) -> Option<&ExportFn> {
        self.index.get(name).map(|&i| &self.exports[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&Descriptor> {
        self.get(name).map(ExportFn::descriptor)
    }

    pub fn arity(&self, name: &str) -> Option<usize> {
        self.get(name).map(ExportFn::arity)
    }

    pub fn options(&self) -> WrapOptions {
        self.options
    }

    // ── Memory ──────────────────────────────────────────────────────────────

    pub fn memory_bytes(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    pub fn memory_size(&self) -> usize {
        self.memory_bytes().len()
    }

    /// Borrow the bytes a view aliases.
    pub fn view_bytes(&self, view: &ArrayView) -> Result<&[u8]> {
        view.bytes(self.memory_bytes())
    }

    /// Copy a view's elements out of linear memory.
    pub fn read_view(&self, view: &ArrayView) -> Result<TypedArray> {
        view.copy(self.memory_bytes())
    }

    /// Replace every view inside `value` with an owned copy.
    pub fn resolve(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::View(view) => Value::Array(self.read_view(view)?),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<_>>()?,
            ),
            other => other.clone(),
        })
    }

    // ── Runtime access ──────────────────────────────────────────────────────

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<T> {
        &mut self.store
    }

    pub fn into_parts(self) -> (Store<T>, Instance) {
        (self.store, self.instance)
    }
}

/// Coerce `args`, run `func`, and convert its first result to a slot.
fn invoke<T>(
    store: &mut Store<T>,
    func: Func,
    params: &[ValType],
    results: &[ValType],
    args: &[Arg],
) -> Result<f64> {
    let inputs: Vec<Val> = args
        .iter()
        .zip(params)
        .map(|(arg, ty)| arg.coerce(*ty))
        .collect();
    let mut outputs: Vec<Val> = results.iter().map(|ty| Val::default(*ty)).collect();
    func.call(store, &inputs, &mut outputs)?;
    Ok(raw_slot(&outputs))
}

/// Convert a raw return to the 64-bit slot.
///
/// `i64` is reinterpreted bit for bit; the other numeric types convert by
/// value.  No result reads as `0.0`.
fn raw_slot(results: &[Val]) -> f64 {
    match results.first() {
        Some(Val::F64(x)) => f64::from(*x),
        Some(Val::F32(x)) => f64::from(f32::from(*x)),
        Some(Val::I32(x)) => f64::from(*x),
        Some(Val::I64(x)) => f64::from_bits(*x as u64),
        _ => 0.0,
    }
}
