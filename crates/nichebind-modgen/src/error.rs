//! Module generator error types.

use thiserror::Error;

/// Errors that can occur while assembling a module.
#[derive(Debug, Error)]
pub enum ModgenError {
    /// Two exports would share a name.
    #[error("duplicate export: {0}")]
    DuplicateExport(String),

    /// A body refers to a parameter the function does not declare.
    #[error("{function}: parameter {index} out of range ({count} declared)")]
    ParamOutOfRange {
        function: String,
        index: u32,
        count: usize,
    },

    /// Static data does not fit the initial memory.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// The assembled module failed validation.
    #[error("WASM validation failed: {0}")]
    ValidationFailed(String),
}

/// Module generator result type alias.
pub type ModgenResult<T> = Result<T, ModgenError>;
