//! Bridge error types.

use nichebind_abi::{ArrayKind, DescriptorError, Transform};
use thiserror::Error;

/// Errors surfaced by wrapped exports, the bindings and the class adapter.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A wrapper was called with the wrong number of arguments.
    /// Raised before the underlying export runs.
    #[error("{name}: expected {expected} argument{}, got {got}", plural(.expected))]
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// The module reported failure through the Result niche.
    /// Displays exactly the message the module wrote.
    #[error("{0}")]
    Failed(String),

    /// The class prefix has no `alloc` export.
    #[error("missing constructor: {0}")]
    MissingConstructor(String),

    /// The class prefix has no `dealloc` export.
    #[error("missing destructor: {0}")]
    MissingDestructor(String),

    /// An explicitly requested class method has no export.
    #[error("undefined method: {0}")]
    UndefinedMethod(String),

    /// No wrapped export with this name.
    #[error("unknown export: {0}")]
    UnknownExport(String),

    /// An export's descriptor cannot be turned into a decoding plan.
    #[error("{name}: invalid descriptor: {source}")]
    InvalidDescriptor {
        name: String,
        #[source]
        source: DescriptorError,
    },

    /// A payload region lies outside linear memory.
    #[error("region {offset}+{len} ({kind:?}) exceeds linear memory of {memory_size} bytes")]
    OutOfBounds {
        kind: ArrayKind,
        offset: u32,
        len: u32,
        memory_size: usize,
    },

    /// A payload region is not aligned to its element width.
    #[error(
        "start offset of {} should be a multiple of {}, got {offset}",
        .kind.typed_array_name(),
        .kind.width()
    )]
    Misaligned { kind: ArrayKind, offset: u32 },

    /// A view was read after linear memory was resized.
    #[error("array view detached: memory resized from {was} to {now} bytes")]
    DetachedView { was: usize, now: usize },

    /// A dynamic payload does not hold `(value, descriptor)` pairs.
    #[error("malformed dynamic payload: {0}")]
    MalformedDynamic(String),

    /// Dynamic payloads nest deeper than the decoder follows.
    #[error("dynamic payload nested deeper than {0} levels")]
    DynamicTooDeep(usize),

    /// A region transform was handed a bare scalar.
    #[error("transform {0:?} requires an array payload")]
    ExpectedRegion(Transform),

    /// A class constructor returned something that is not a numeric handle.
    #[error("invalid object handle from {0}")]
    InvalidHandle(String),

    /// The module does not export `memory`.
    #[error("module has no `memory` export")]
    MissingMemory,

    /// Structured payload was not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Instantiation failures and traps from the module runtime.
    #[error(transparent)]
    Wasm(#[from] wasmi::Error),
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

/// Bridge result type alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
