//! Wire contract for nichebind modules.
//!
//! A conforming module returns every value through a single `f64` slot and
//! ships, next to each export `<name>`, a zero-argument `<name>_info_` export
//! whose slot packs a [`Descriptor`].  This crate defines both halves of that
//! contract:
//!
//! - **Decoding side**: [`Descriptor`] parsing and validation, the
//!   [`Scratch`] reinterpretation cell, and the [`Niche`] classifiers used by
//!   the host runtime.
//! - **Encoding side**: descriptor builders and the [`encode`] helpers that
//!   module producers (and the test-module generator) use to pack values.
//!
//! # Slot layout
//!
//! ```text
//! descriptor octet : [is_result, is_option, is_array, array_kind, transform, is_dynamic, 0, 0]
//! pair             : [word0 (low 32 bits), word1 (high 32 bits)]
//! ```

mod descriptor;
mod error;
mod niche;
mod scratch;
pub mod encode;

pub use descriptor::{ArrayKind, Descriptor, Shape, Transform, INFO_SUFFIX};
pub use error::DescriptorError;
pub use niche::{Niche, NicheSignal, NAN_HIGH_WORD};
pub use scratch::{Packed, Scratch};

