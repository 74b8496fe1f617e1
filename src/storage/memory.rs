//! In-memory tag table.
//!
//! This module provides a plain in-memory implementation of [`TagTable`].
//! It is intended for embedded usage, tests, and as a reference implementation
//! of the storage contract the engines depend on. It does not implement the
//! byte layout allocator or the composite type system: composite tags are
//! created with an explicit element size.

use std::collections::HashMap;

use crate::datatype::DataType;
use crate::handle::{TagHandle, TagIndex};
use crate::storage::traits::{StorageError, TagFlags, TagInfo, TagTable};

#[derive(Debug, Clone)]
struct TagRecord {
    name: String,
    datatype: DataType,
    count: usize,
    flags: TagFlags,
    data: Vec<u8>,
    deleted: bool,
}

/// In-memory tag table.
///
/// Indices are assigned sequentially and never reused; a deleted tag keeps
/// its slot so stale handles report `Deleted` rather than aliasing a new tag.
#[derive(Debug, Default)]
pub struct MemoryTagTable {
    tags: Vec<TagRecord>,
    by_name: HashMap<String, TagIndex>,
}

impl MemoryTagTable {
    /// Create a new empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive tag of `count` elements, zero initialized.
    pub fn add_tag(
        &mut self,
        name: &str,
        datatype: DataType,
        count: usize,
        flags: TagFlags,
    ) -> Result<TagIndex, StorageError> {
        let size = datatype.size_of(count).ok_or_else(|| {
            StorageError::Backend(format!("{datatype} needs an explicit element size"))
        })?;
        self.insert(name, datatype, count, size, flags)
    }

    /// Add a composite tag whose elements are `element_size` bytes each.
    pub fn add_custom(
        &mut self,
        name: &str,
        type_id: u32,
        element_size: usize,
        count: usize,
        flags: TagFlags,
    ) -> Result<TagIndex, StorageError> {
        self.insert(name, DataType::Custom(type_id), count, element_size * count, flags)
    }

    /// Look up a live tag by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TagIndex> {
        self.by_name.get(name).copied()
    }

    /// Handle covering the whole tag.
    pub fn handle(&self, index: TagIndex) -> Result<TagHandle, StorageError> {
        let rec = self.live(index)?;
        Ok(TagHandle::raw(index, rec.datatype, 0, rec.data.len(), rec.count))
    }

    fn insert(
        &mut self,
        name: &str,
        datatype: DataType,
        count: usize,
        size: usize,
        flags: TagFlags,
    ) -> Result<TagIndex, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::Backend("tag name cannot be empty".to_string()));
        }
        if count == 0 || size == 0 {
            return Err(StorageError::Backend(format!("tag '{name}' would be empty")));
        }
        if self.by_name.contains_key(name) {
            return Err(StorageError::DuplicateName(name.to_string()));
        }
        let raw = u32::try_from(self.tags.len())
            .map_err(|_| StorageError::Backend("tag table is full".to_string()))?;
        let index = TagIndex::new(raw);
        let flags = TagFlags {
            is_virtual: flags.is_virtual || flags.is_queue,
            ..flags
        };
        self.tags.push(TagRecord {
            name: name.to_string(),
            datatype,
            count,
            flags,
            data: vec![0; size],
            deleted: false,
        });
        self.by_name.insert(name.to_string(), index);
        Ok(index)
    }

    fn slot(&self, index: TagIndex) -> Result<&TagRecord, StorageError> {
        self.tags.get(index.as_usize()).ok_or(StorageError::OutOfBounds {
            index,
            len: self.tags.len(),
        })
    }

    fn live(&self, index: TagIndex) -> Result<&TagRecord, StorageError> {
        let rec = self.slot(index)?;
        if rec.deleted {
            return Err(StorageError::Deleted(index));
        }
        Ok(rec)
    }

    fn live_mut(&mut self, index: TagIndex) -> Result<&mut TagRecord, StorageError> {
        let len = self.tags.len();
        let rec = self
            .tags
            .get_mut(index.as_usize())
            .ok_or(StorageError::OutOfBounds { index, len })?;
        if rec.deleted {
            return Err(StorageError::Deleted(index));
        }
        Ok(rec)
    }

    fn writable_range(
        &mut self,
        index: TagIndex,
        offset: usize,
        len: usize,
    ) -> Result<&mut [u8], StorageError> {
        let rec = self.live_mut(index)?;
        if rec.flags.is_virtual && !rec.flags.is_queue {
            return Err(StorageError::Illegal {
                index,
                reason: "virtual tag has no writable storage".to_string(),
            });
        }
        let size = rec.data.len();
        let end = offset.checked_add(len).filter(|end| *end <= size).ok_or(
            StorageError::RangeTooBig {
                index,
                end: offset.saturating_add(len),
                size,
            },
        )?;
        Ok(&mut rec.data[offset..end])
    }
}

impl TagTable for MemoryTagTable {
    fn len(&self) -> usize {
        self.tags.len()
    }

    fn info(&self, index: TagIndex) -> Result<TagInfo, StorageError> {
        let rec = self.live(index)?;
        Ok(TagInfo {
            index,
            name: rec.name.clone(),
            datatype: rec.datatype,
            count: rec.count,
            size: rec.data.len(),
            flags: rec.flags,
        })
    }

    fn data(&self, index: TagIndex) -> Result<&[u8], StorageError> {
        Ok(&self.live(index)?.data)
    }

    fn write(&mut self, index: TagIndex, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let dst = self.writable_range(index, offset, data.len())?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn mask_write(
        &mut self,
        index: TagIndex,
        offset: usize,
        data: &[u8],
        mask: &[u8],
    ) -> Result<(), StorageError> {
        if data.len() != mask.len() {
            return Err(StorageError::Backend(format!(
                "mask length {} does not match data length {}",
                mask.len(),
                data.len()
            )));
        }
        let dst = self.writable_range(index, offset, data.len())?;
        for ((d, &v), &m) in dst.iter_mut().zip(data).zip(mask) {
            *d = (*d & !m) | (v & m);
        }
        Ok(())
    }

    fn delete(&mut self, index: TagIndex) -> Result<(), StorageError> {
        let rec = self.live_mut(index)?;
        rec.deleted = true;
        rec.data = Vec::new();
        let name = std::mem::take(&mut rec.name);
        self.by_name.remove(&name);
        Ok(())
    }
}
