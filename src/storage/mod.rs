//! Tag storage for tagcore.
//!
//! The engines only see the [`TagTable`] trait. [`MemoryTagTable`] is the
//! in-process implementation used by embedders and tests.

/// In-memory tag table.
pub mod memory;
mod traits;

pub use memory::MemoryTagTable;
pub use traits::{StorageError, TagFlags, TagInfo, TagTable};
