//! WebAssembly module generator for the nichebind calling convention.
//!
//! # Architecture
//!
//! [`ModuleBuilder`] collects function exports, their descriptors and static
//! data, then assembles a self-contained `.wasm` module:
//!
//! ## Exports
//! - `<name>(params…) -> f64`: the raw function, returning one slot
//! - `<name>_info_() -> f64`: the packed [`nichebind_abi::Descriptor`]
//! - `memory`: linear memory
//!
//! ## Bodies
//!
//! Function bodies are declarative: a list of [`Effect`]s run in order, then
//! a [`Ret`] producing the slot.  This covers what host-side tests need to
//! exercise (constant slots, echoing arguments, mutating or growing memory)
//! without a general-purpose compiler.

pub mod body;
pub mod builder;
pub mod error;
pub mod types;

pub use body::{Body, Effect, Ret};
pub use builder::ModuleBuilder;
pub use error::{ModgenError, ModgenResult};
pub use wasm_encoder::ValType;
