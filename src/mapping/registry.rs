//! Per-tag mapping lists.

use std::collections::{HashMap, VecDeque};

use crate::error::{ExecutionError, TagResult, ValidationError};
use crate::events::registry::check_bounds;
use crate::handle::{TagHandle, TagIndex};
use crate::storage::TagTable;

use super::map::{DataMapping, MapId, MappingInfo};
use super::propagation::PendingWrite;

#[derive(Debug, Default)]
struct TagMaps {
    next_id: u32,
    list: VecDeque<DataMapping>,
}

/// Mappings of every source tag.
#[derive(Debug, Default)]
pub struct MapRegistry {
    tags: HashMap<TagIndex, TagMaps>,
}

impl MapRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `source` to `dest`. Writes touching the source range are copied
    /// to the destination range from then on.
    pub fn add<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        source: TagHandle,
        dest: TagHandle,
    ) -> TagResult<MapId> {
        match self.insert(table, source, dest) {
            Ok(id) => {
                tracing::debug!(
                    source = %source.index,
                    dest = %dest.index,
                    map = %id,
                    masked = source.datatype.is_bool(),
                    "mapping added"
                );
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(source = %source.index, dest = %dest.index, error = %err, "mapping rejected");
                Err(err)
            }
        }
    }

    fn insert<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        source: TagHandle,
        dest: TagHandle,
    ) -> TagResult<MapId> {
        let src_info = table.info(source.index)?;
        let dst_info = table.info(dest.index)?;
        source.validate_shape()?;
        dest.validate_shape()?;
        for info in [&src_info, &dst_info] {
            if info.flags.is_virtual {
                return Err(ValidationError::IllegalOnTagKind {
                    index: info.index,
                    reason: "mappings cannot touch virtual tags".to_string(),
                }
                .into());
            }
        }
        if dst_info.flags.read_only {
            return Err(ValidationError::ReadOnly { index: dest.index }.into());
        }
        for (handle, size, role) in [(&source, src_info.size, "source"), (&dest, dst_info.size, "destination")] {
            if handle.end() > size {
                return Err(ValidationError::TooBig {
                    what: format!("mapping {role} on tag {}", handle.index),
                    end: handle.end(),
                    limit: size,
                }
                .into());
            }
        }
        if source.size > dest.size {
            return Err(ValidationError::TooBig {
                what: format!("mapping source of {} bytes", source.size),
                end: dest.byte + source.size,
                limit: dest.end(),
            }
            .into());
        }

        let entry = self.tags.entry(source.index).or_default();
        let next_id = entry.next_id.checked_add(1).ok_or(ExecutionError::IdsExhausted {
            index: source.index,
            what: "mapping".to_string(),
        })?;
        let id = MapId::new(entry.next_id);
        let map = DataMapping::new(id, source, dest, dst_info.size)?;
        entry.next_id = next_id;
        entry.list.push_front(map);
        Ok(id)
    }

    /// Remove one mapping of `index`.
    pub fn del<T: TagTable + ?Sized>(&mut self, table: &T, index: TagIndex, id: MapId) -> TagResult<()> {
        check_bounds(table, index)?;
        if self.remove(index, id) {
            tracing::debug!(source = %index, map = %id, "mapping deleted");
            Ok(())
        } else {
            Err(ExecutionError::MappingNotFound { index, id }.into())
        }
    }

    /// Remove every mapping of `index`. Returns how many were removed.
    pub fn del_all(&mut self, index: TagIndex) -> usize {
        self.tags
            .get_mut(&index)
            .map(|e| std::mem::take(&mut e.list).len())
            .unwrap_or(0)
    }

    /// Snapshot of one mapping.
    pub fn get<T: TagTable + ?Sized>(&self, table: &T, index: TagIndex, id: MapId) -> TagResult<MappingInfo> {
        check_bounds(table, index)?;
        self.tags
            .get(&index)
            .and_then(|e| e.list.iter().find(|m| m.id == id))
            .map(DataMapping::info)
            .ok_or_else(|| ExecutionError::MappingNotFound { index, id }.into())
    }

    /// Snapshots of a tag's mappings, newest first.
    pub fn maps_of<T: TagTable + ?Sized>(&self, table: &T, index: TagIndex) -> TagResult<Vec<MappingInfo>> {
        check_bounds(table, index)?;
        Ok(self
            .tags
            .get(&index)
            .map(|e| e.list.iter().map(DataMapping::info).collect())
            .unwrap_or_default())
    }

    /// Destination writes caused by writing `data` at `offset` into
    /// `index`, in list order.
    pub(crate) fn plan(&self, index: TagIndex, offset: usize, data: &[u8], source_tag: &[u8]) -> Vec<PendingWrite> {
        self.tags
            .get(&index)
            .map(|e| {
                e.list
                    .iter()
                    .filter_map(|m| m.target(offset, data, source_tag))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn remove(&mut self, index: TagIndex, id: MapId) -> bool {
        let Some(entry) = self.tags.get_mut(&index) else {
            return false;
        };
        match entry.list.iter().position(|m| m.id == id) {
            Some(pos) => entry.list.remove(pos).is_some(),
            None => false,
        }
    }
}
