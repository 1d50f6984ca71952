//! Module assembler.
//!
//! Assembly pipeline:
//! 1. Check export names for collisions
//! 2. Emit one type + function entry per export
//! 3. Emit memory, exports, code, data and the custom section
//! 4. Validate with `wasmparser`

use std::collections::HashSet;

use nichebind_abi::{Descriptor, INFO_SUFFIX};
use wasm_encoder::{
    CodeSection, ConstExpr, CustomSection, DataSection, ExportKind, ExportSection,
    FunctionSection, MemorySection, MemoryType, Module, TypeSection, ValType,
};

use crate::body::Body;
use crate::error::{ModgenError, ModgenResult};
use crate::types::*;

/// One exported function awaiting assembly.
#[derive(Debug, Clone)]
struct FunctionDef {
    export: String,
    params: Vec<ValType>,
    body: Body,
}

/// Builds a module following the nichebind calling convention.
///
/// ```
/// use nichebind_abi::{Descriptor, Transform};
/// use nichebind_modgen::{Body, ModuleBuilder, Ret, ValType};
///
/// let mut b = ModuleBuilder::new();
/// b.function(
///     "double",
///     &[ValType::F64, ValType::F64],
///     Body::returning(Ret::SumParams),
///     Descriptor::scalar(Transform::Identity),
/// );
/// let wasm = b.finish().unwrap();
/// assert_eq!(&wasm[..4], b"\0asm");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModuleBuilder {
    functions: Vec<FunctionDef>,
    /// Bytes placed at `DATA_START`.
    data: Vec<u8>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Data ─────────────────────────────────────────────────────────────

    /// Intern raw bytes, returning their absolute offset in linear memory.
    pub fn data(&mut self, bytes: &[u8]) -> u32 {
        let padding = (DATA_ALIGN as usize - self.data.len() % DATA_ALIGN as usize)
            % DATA_ALIGN as usize;
        self.data.extend(std::iter::repeat(0).take(padding));
        let offset = DATA_START + self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Intern a NUL-terminated UTF-8 string (the error-message format).
    pub fn cstring(&mut self, s: &str) -> u32 {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.data(&bytes)
    }

    /// Intern a sequence of `f64` cells.
    pub fn f64s(&mut self, values: &[f64]) -> u32 {
        let bytes: Vec<u8> = values
            .iter()
            .flat_map(|x| x.to_bits().to_le_bytes())
            .collect();
        self.data(&bytes)
    }

    /// Absolute offset one past the last interned byte.
    pub fn data_end(&self) -> u32 {
        DATA_START + self.data.len() as u32
    }

    // ── Functions ────────────────────────────────────────────────────────

    /// Add `name` together with its `name_info_` descriptor export.
    pub fn function(
        &mut self,
        name: &str,
        params: &[ValType],
        body: Body,
        descriptor: Descriptor,
    ) -> &mut Self {
        self.raw_function(name, params, body);
        self.raw_function(
            &format!("{name}{INFO_SUFFIX}"),
            &[],
            Body::constant(descriptor.to_slot()),
        )
    }

    /// Add an export without a descriptor companion.
    pub fn raw_function(&mut self, name: &str, params: &[ValType], body: Body) -> &mut Self {
        self.functions.push(FunctionDef {
            export: name.to_string(),
            params: params.to_vec(),
            body,
        });
        self
    }

    /// Export names in declaration order.
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.export.as_str())
    }

    // ── Assembly ─────────────────────────────────────────────────────────

    /// Assemble and validate the module.
    pub fn finish(&self) -> ModgenResult<Vec<u8>> {
        self.check_names()?;
        let memory_bytes = INITIAL_MEMORY_PAGES * PAGE_SIZE as u64;
        if self.data_end() as u64 > memory_bytes {
            return Err(ModgenError::LimitExceeded(format!(
                "{} bytes of data do not fit {} bytes of initial memory",
                self.data.len(),
                memory_bytes
            )));
        }

        let mut module = Module::new();

        // 1. Type section (one signature per function)
        let mut types = TypeSection::new();
        for def in &self.functions {
            types.ty().function(def.params.clone(), def.body.results());
        }
        module.section(&types);

        // 2. Function section
        let mut funcs = FunctionSection::new();
        for index in 0..self.functions.len() {
            funcs.function(index as u32);
        }
        module.section(&funcs);

        // 3. Memory section
        module.section(&self.emit_memory());

        // 4. Export section
        module.section(&self.emit_exports());

        // 5. Code section
        let mut code = CodeSection::new();
        for def in &self.functions {
            code.function(&def.body.emit(&def.export, &def.params)?);
        }
        module.section(&code);

        // 6. Data section
        if !self.data.is_empty() {
            let mut data_sec = DataSection::new();
            data_sec.active(
                0,
                &ConstExpr::i32_const(DATA_START as i32),
                self.data.iter().copied(),
            );
            module.section(&data_sec);
        }

        // 7. Custom section
        module.section(&CustomSection {
            name: std::borrow::Cow::Borrowed(CUSTOM_SECTION_NAME),
            data: std::borrow::Cow::Borrowed(GENERATOR_VERSION.as_bytes()),
        });

        let wasm_bytes = module.finish();

        // 8. Validate
        wasmparser::validate(&wasm_bytes)
            .map_err(|e| ModgenError::ValidationFailed(format!("{e}")))?;

        Ok(wasm_bytes)
    }

    fn check_names(&self) -> ModgenResult<()> {
        let mut seen = HashSet::from(["memory"]);
        for def in &self.functions {
            if !seen.insert(def.export.as_str()) {
                return Err(ModgenError::DuplicateExport(def.export.clone()));
            }
        }
        Ok(())
    }

    fn emit_memory(&self) -> MemorySection {
        let mut memory = MemorySection::new();
        memory.memory(MemoryType {
            minimum: INITIAL_MEMORY_PAGES,
            maximum: Some(MAX_MEMORY_PAGES),
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        memory
    }

    fn emit_exports(&self) -> ExportSection {
        let mut exports = ExportSection::new();
        for (index, def) in self.functions.iter().enumerate() {
            exports.export(&def.export, ExportKind::Func, index as u32);
        }
        exports.export("memory", ExportKind::Memory, 0);
        exports
    }
}
