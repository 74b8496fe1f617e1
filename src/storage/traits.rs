//! Abstract storage traits for tagcore.
//!
//! The tag table is the one collaborator both engines read and write. These
//! traits define the contract a storage backend must implement:
//! - bounds-checked access to a tag's contiguous byte buffer
//! - classification flags (virtual, queue, read only)
//! - plain and masked writes that report a deleted tag distinctly

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datatype::DataType;
use crate::handle::TagIndex;

/// Errors that can occur during storage operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// Index is not below the table length.
    #[error("Tag index {index} is out of bounds (table holds {len} tags)")]
    OutOfBounds { index: TagIndex, len: usize },

    /// The tag at this index has been deleted.
    #[error("Tag {0} has been deleted")]
    Deleted(TagIndex),

    /// A byte range runs past the end of the tag.
    #[error("Range ending at byte {end} exceeds tag {index} of {size} bytes")]
    RangeTooBig { index: TagIndex, end: usize, size: usize },

    /// The operation is not allowed on this kind of tag.
    #[error("Illegal operation on tag {index}: {reason}")]
    Illegal { index: TagIndex, reason: String },

    /// A tag with this name already exists.
    #[error("Duplicate tag name: {0}")]
    DuplicateName(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Classification flags of a tag.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagFlags {
    /// Backed by non-ordinary storage (computed or queued data).
    pub is_virtual: bool,
    /// A virtual tag backed by a queue.
    pub is_queue: bool,
    pub read_only: bool,
}

impl TagFlags {
    /// Ordinary read-write tag.
    pub const NONE: Self = Self {
        is_virtual: false,
        is_queue: false,
        read_only: false,
    };

    /// Read-only ordinary tag.
    pub const READ_ONLY: Self = Self {
        is_virtual: false,
        is_queue: false,
        read_only: true,
    };

    /// Virtual tag without queue storage.
    pub const VIRTUAL: Self = Self {
        is_virtual: true,
        is_queue: false,
        read_only: false,
    };

    /// Queue-backed virtual tag.
    pub const QUEUE: Self = Self {
        is_virtual: true,
        is_queue: true,
        read_only: false,
    };
}

/// Description of one tag.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub index: TagIndex,
    pub name: String,
    pub datatype: DataType,
    pub count: usize,
    /// Total byte size of the tag buffer.
    pub size: usize,
    pub flags: TagFlags,
}

/// Storage trait for the tag table.
///
/// The table is owned by the write pipeline and always accessed under its
/// lock, so implementations need no interior synchronization.
///
/// # Errors
/// - `OutOfBounds`: index not below [`TagTable::len`]
/// - `Deleted`: the slot exists but the tag was deleted
/// - `RangeTooBig`: the byte range runs past the tag
pub trait TagTable: Send {
    /// Number of index slots, deleted tags included.
    fn len(&self) -> usize;

    /// Whether the table has no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Describe the tag at `index`.
    fn info(&self, index: TagIndex) -> Result<TagInfo, StorageError>;

    /// The tag's whole byte buffer.
    fn data(&self, index: TagIndex) -> Result<&[u8], StorageError>;

    /// Copy `data` into the tag starting at byte `offset`.
    fn write(&mut self, index: TagIndex, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Copy only the bits of `data` selected by `mask` into the tag starting
    /// at byte `offset`. `data` and `mask` have the same length.
    fn mask_write(
        &mut self,
        index: TagIndex,
        offset: usize,
        data: &[u8],
        mask: &[u8],
    ) -> Result<(), StorageError>;

    /// Delete the tag. Its index stays allocated and reports `Deleted`.
    fn delete(&mut self, index: TagIndex) -> Result<(), StorageError>;

    /// Copy of `len` bytes starting at `offset`.
    fn read(&self, index: TagIndex, offset: usize, len: usize) -> Result<Vec<u8>, StorageError> {
        let data = self.data(index)?;
        let end = offset.saturating_add(len);
        data.get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or(StorageError::RangeTooBig {
                index,
                end,
                size: data.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_tag_table_object_safe(_: &dyn TagTable) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Deleted(TagIndex::new(4));
        assert!(err.to_string().contains("deleted"));

        let err = StorageError::Backend("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn queue_flags_are_virtual() {
        assert!(TagFlags::QUEUE.is_virtual);
        assert!(TagFlags::QUEUE.is_queue);
        assert!(!TagFlags::VIRTUAL.is_queue);
    }
}
