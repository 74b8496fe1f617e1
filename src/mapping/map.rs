//! Mapping records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bits;
use crate::error::{TagResult, ValidationError};
use crate::events::event::alloc;
use crate::handle::{ranges_overlap, TagHandle};

use super::propagation::PendingWrite;

/// Identifier of a mapping, unique within its source tag.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(u32);

impl MapId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of a mapping.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingInfo {
    pub id: MapId,
    pub source: TagHandle,
    pub destination: TagHandle,
    /// Destination bits the mapping owns, for BOOL sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub(crate) struct DataMapping {
    pub(crate) id: MapId,
    pub(crate) source: TagHandle,
    pub(crate) dest: TagHandle,
    mask: Option<Vec<u8>>,
}

impl DataMapping {
    /// Build a mapping. `dest_size` is the destination tag's byte size.
    pub(crate) fn new(
        id: MapId,
        source: TagHandle,
        dest: TagHandle,
        dest_size: usize,
    ) -> TagResult<Self> {
        let mask = if source.datatype.is_bool() {
            Some(build_mask(&source, &dest, dest_size)?)
        } else {
            None
        };
        Ok(Self {
            id,
            source,
            dest,
            mask,
        })
    }

    /// The destination write caused by writing `data` at `offset` into the
    /// source tag, if the write touches this mapping.
    ///
    /// `source_tag` is the committed source buffer; masked mappings read all
    /// of their bits from it.
    pub(crate) fn target(
        &self,
        offset: usize,
        data: &[u8],
        source_tag: &[u8],
    ) -> Option<PendingWrite> {
        let src = &self.source;
        if !ranges_overlap(src.byte, src.size, offset, data.len()) {
            return None;
        }
        let write = match &self.mask {
            Some(mask) => {
                let mut scratch = vec![0u8; mask.len()];
                bits::copy(
                    source_tag,
                    bits::position(src.byte, src.bit),
                    &mut scratch,
                    usize::from(self.dest.bit),
                    src.count,
                );
                PendingWrite {
                    source: src.index,
                    map: self.id,
                    dest: self.dest.index,
                    offset: self.dest.byte,
                    data: scratch,
                    mask: Some(mask.clone()),
                    depth: 1,
                }
            }
            None => {
                let lo = offset.max(src.byte);
                let hi = (offset + data.len()).min(src.end());
                PendingWrite {
                    source: src.index,
                    map: self.id,
                    dest: self.dest.index,
                    offset: self.dest.byte + (lo - src.byte),
                    data: data.get(lo - offset..hi - offset)?.to_vec(),
                    mask: None,
                    depth: 1,
                }
            }
        };
        Some(write)
    }

    pub(crate) fn info(&self) -> MappingInfo {
        MappingInfo {
            id: self.id,
            source: self.source,
            destination: self.dest,
            mask: self.mask.clone(),
        }
    }
}

/// Destination-aligned mask of the bits a BOOL mapping owns: `source.count`
/// bits starting at `dest.bit`, positioned at `dest.byte`.
fn build_mask(source: &TagHandle, dest: &TagHandle, dest_size: usize) -> TagResult<Vec<u8>> {
    let len = source.size.max(bits::span_len(dest.bit, source.count));
    if dest.byte + len > dest_size {
        return Err(ValidationError::TooBig {
            what: format!("mapping mask on tag {}", dest.index),
            end: dest.byte + len,
            limit: dest_size,
        }
        .into());
    }
    let mut mask = alloc("mapping mask", len)?;
    mask.resize(len, 0);
    bits::fill(&mut mask, usize::from(dest.bit), source.count);
    Ok(mask)
}
