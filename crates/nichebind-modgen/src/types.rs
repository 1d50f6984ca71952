//! Memory layout constants for generated modules.
//!
//! ```text
//! 0 .. DATA_START          : reserved (offset 0 is never a valid pointer)
//! DATA_START .. data_end   : interned data segments, each 8-byte aligned
//! ```

/// Size of a WebAssembly page in bytes.
pub const PAGE_SIZE: u32 = 65_536;

/// Initial linear memory size in pages.
pub const INITIAL_MEMORY_PAGES: u64 = 1;

/// Maximum linear memory pages (16 MiB).
pub const MAX_MEMORY_PAGES: u64 = 256;

/// First byte available for interned data.  Keeping the low addresses free
/// means no data pointer can collide with the `0`/`1` niche words.
pub const DATA_START: u32 = 16;

/// Alignment applied to every interned data block.
pub const DATA_ALIGN: u32 = 8;

/// Custom section carrying the generator version.
pub const CUSTOM_SECTION_NAME: &str = "nichebind";

/// Generator version embedded in the custom section.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
