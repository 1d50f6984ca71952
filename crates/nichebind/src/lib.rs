//! Host runtime for nichebind modules.
//!
//! ```text
//! .wasm → wasmi instance → export discovery → per-export Plan → Bindings::call → Value
//! ```
//!
//! A nichebind module returns every result through one `f64` slot and
//! describes each export `<name>` with a `<name>_info_` export.  [`Bindings`]
//! reads those descriptors once and decodes every later call accordingly:
//!
//! - Result exports raise [`BridgeError::Failed`] with the module's message.
//! - Option exports return [`Value::Null`] when absent.
//! - Array exports return an [`ArrayView`] into linear memory, or an owned
//!   [`TypedArray`] when [`WrapOptions::always_copy_data`] is set.
//! - Strings, JSON, 64-bit integers, packed arrays and self-describing
//!   dynamic payloads are decoded by the transform the descriptor names.
//!
//! [`ClassAdapter`] layers object-style dispatch over prefixed exports.
//!
//! ```no_run
//! use nichebind::{args, Bindings, WrapOptions};
//!
//! let wasm = std::fs::read("module.wasm").unwrap();
//! let mut bindings = Bindings::instantiate(&wasm, WrapOptions::default()).unwrap();
//! let sum = bindings.call("add", &args![1, 2]).unwrap();
//! assert_eq!(sum.as_f64(), Some(3.0));
//! ```

mod args;
mod bindings;
mod class;
mod decode;
mod error;
mod options;
mod transform;
mod value;

pub use args::Arg;
pub use bindings::{Bindings, ExportFn};
pub use class::{ClassAdapter, ClassOptions, MethodTransform, Object};
pub use error::{BridgeError, Result};
pub use options::WrapOptions;
pub use value::{ArrayView, TypedArray, Value};

pub use nichebind_abi::{ArrayKind, Descriptor, Packed, Shape, Transform};
