//! Declarative function bodies and their instruction emission.

use wasm_encoder::{Function, Instruction, MemArg, ValType};

use crate::error::{ModgenError, ModgenResult};

/// A side effect performed before the function returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// `memory.grow` by the given number of pages (result dropped).
    Grow(u32),
    /// Add one to the little-endian `u32` at `offset`.
    IncrementU32(u32),
    /// Store a byte at `offset`.
    StoreU8 { offset: u32, value: u8 },
}

/// How the returned slot is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Ret {
    /// A constant slot, emitted bit-exactly.
    Const(f64),
    /// The given parameter, widened to `f64` (`i64` is reinterpreted).
    Param(u32),
    /// Sum of all parameters, each widened to `f64`.
    SumParams,
    /// No result at all.
    None,
}

/// A function body: effects in order, then the return.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub effects: Vec<Effect>,
    pub ret: Ret,
}

impl Body {
    /// A body that only returns.
    pub fn returning(ret: Ret) -> Self {
        Self {
            effects: Vec::new(),
            ret,
        }
    }

    /// Shorthand for a constant slot.
    pub fn constant(slot: f64) -> Self {
        Self::returning(Ret::Const(slot))
    }

    /// Run `effect` before returning, after any effects already added.
    pub fn after(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Result types of the emitted function.
    pub fn results(&self) -> Vec<ValType> {
        match self.ret {
            Ret::None => vec![],
            _ => vec![ValType::F64],
        }
    }

    /// Emit the function body for the given parameter list.
    pub fn emit(&self, name: &str, params: &[ValType]) -> ModgenResult<Function> {
        let mut f = Function::new(vec![]);
        for effect in &self.effects {
            emit_effect(&mut f, effect);
        }
        match &self.ret {
            Ret::Const(slot) => emit_slot_const(&mut f, *slot),
            Ret::Param(index) => {
                let ty = params
                    .get(*index as usize)
                    .ok_or_else(|| ModgenError::ParamOutOfRange {
                        function: name.to_string(),
                        index: *index,
                        count: params.len(),
                    })?;
                f.instruction(&Instruction::LocalGet(*index));
                emit_widen(&mut f, *ty);
            }
            Ret::SumParams => {
                emit_slot_const(&mut f, 0.0);
                for (i, ty) in params.iter().enumerate() {
                    f.instruction(&Instruction::LocalGet(i as u32));
                    emit_widen(&mut f, *ty);
                    f.instruction(&Instruction::F64Add);
                }
            }
            Ret::None => {}
        }
        f.instruction(&Instruction::End);
        Ok(f)
    }
}

// ── Emit helpers ─────────────────────────────────────────────────────────────

fn memarg(align: u32) -> MemArg {
    MemArg {
        offset: 0,
        align,
        memory_index: 0,
    }
}

fn emit_effect(f: &mut Function, effect: &Effect) {
    match effect {
        Effect::Grow(pages) => {
            f.instruction(&Instruction::I32Const(*pages as i32));
            f.instruction(&Instruction::MemoryGrow(0));
            f.instruction(&Instruction::Drop);
        }
        Effect::IncrementU32(offset) => {
            f.instruction(&Instruction::I32Const(*offset as i32));
            f.instruction(&Instruction::I32Const(*offset as i32));
            f.instruction(&Instruction::I32Load(memarg(2)));
            f.instruction(&Instruction::I32Const(1));
            f.instruction(&Instruction::I32Add);
            f.instruction(&Instruction::I32Store(memarg(2)));
        }
        Effect::StoreU8 { offset, value } => {
            f.instruction(&Instruction::I32Const(*offset as i32));
            f.instruction(&Instruction::I32Const(*value as i32));
            f.instruction(&Instruction::I32Store8(memarg(0)));
        }
    }
}

/// Push an `f64` with its exact bit pattern (NaN payloads included).
fn emit_slot_const(f: &mut Function, slot: f64) {
    f.instruction(&Instruction::I64Const(slot.to_bits() as i64));
    f.instruction(&Instruction::F64ReinterpretI64);
}

/// Convert the value on top of the stack from `ty` to `f64`.
fn emit_widen(f: &mut Function, ty: ValType) {
    match ty {
        ValType::I32 => {
            f.instruction(&Instruction::F64ConvertI32S);
        }
        ValType::I64 => {
            f.instruction(&Instruction::F64ReinterpretI64);
        }
        ValType::F32 => {
            f.instruction(&Instruction::F64PromoteF32);
        }
        _ => {}
    }
}
