//! Tag indices and handles.
//!
//! A handle is a byte/bit sub-range view into one tag. Events and mappings
//! copy the handle they were created from, so a handle is a small `Copy`
//! value rather than a reference into the tag table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype::DataType;
use crate::error::{TagResult, ValidationError};

/// Stable identifier of a tag in the tag table.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagIndex(u32);

impl TagIndex {
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The index as a table position.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TagIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TagIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// A view into part of a tag.
///
/// Invariant: `byte + size` never exceeds the referenced tag's byte size.
/// The constructors here only compute the geometry; bounds against the tag
/// are checked by whoever accepts the handle.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagHandle {
    pub index: TagIndex,
    pub byte: usize,
    /// Starting bit within `byte`, only meaningful for `BOOL` data.
    pub bit: u8,
    pub size: usize,
    pub count: usize,
    pub datatype: DataType,
}

impl TagHandle {
    /// Handle covering `count` primitive elements starting at element `first`.
    ///
    /// For `BOOL` data `first` is a bit number and the handle starts at
    /// `(first / 8, first % 8)`.
    pub fn elements(
        index: TagIndex,
        datatype: DataType,
        first: usize,
        count: usize,
    ) -> TagResult<Self> {
        if count == 0 {
            return Err(ValidationError::InvalidHandle {
                reason: "handle count must be at least one".to_string(),
            }
            .into());
        }
        if datatype.is_bool() {
            return Ok(Self::bits(index, first / 8, (first % 8) as u8, count));
        }
        let Some(width) = datatype.width_bytes() else {
            return Err(ValidationError::InvalidHandle {
                reason: format!("{datatype} has no fixed element width"),
            }
            .into());
        };
        Ok(Self {
            index,
            byte: first * width,
            bit: 0,
            size: count * width,
            count,
            datatype,
        })
    }

    /// Handle covering `count` bits starting at `(byte, bit)`.
    #[must_use]
    pub fn bits(index: TagIndex, byte: usize, bit: u8, count: usize) -> Self {
        Self {
            index,
            byte,
            bit,
            size: (usize::from(bit) + count).div_ceil(8),
            count,
            datatype: DataType::Bool,
        }
    }

    /// Handle over raw bytes of a composite tag.
    #[must_use]
    pub const fn raw(index: TagIndex, datatype: DataType, byte: usize, size: usize, count: usize) -> Self {
        Self {
            index,
            byte,
            bit: 0,
            size,
            count,
            datatype,
        }
    }

    /// One past the last byte of the handle.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.byte + self.size
    }

    /// Whether this handle's byte range intersects the half-open range
    /// `[offset, offset + size)`.
    #[must_use]
    pub const fn overlaps(&self, offset: usize, size: usize) -> bool {
        ranges_overlap(self.byte, self.size, offset, size)
    }

    pub(crate) fn validate_shape(&self) -> TagResult<()> {
        if self.count == 0 {
            return Err(ValidationError::InvalidHandle {
                reason: "handle count must be at least one".to_string(),
            }
            .into());
        }
        if self.bit > 7 {
            return Err(ValidationError::InvalidHandle {
                reason: format!("bit offset {} is out of range 0..=7", self.bit),
            }
            .into());
        }
        if self.size == 0 {
            return Err(ValidationError::InvalidHandle {
                reason: "handle size must be at least one byte".to_string(),
            }
            .into());
        }
        let expected = match self.datatype {
            DataType::Bool => Some(crate::bits::span_len(self.bit, self.count)),
            DataType::Custom(_) => None,
            other => other.size_of(self.count),
        };
        if let Some(expected) = expected.filter(|e| *e != self.size) {
            return Err(ValidationError::InvalidHandle {
                reason: format!(
                    "{} elements of {} span {expected} bytes, handle says {}",
                    self.count, self.datatype, self.size
                ),
            }
            .into());
        }
        Ok(())
    }
}

/// Half-open range intersection: `[a, a + a_len)` against `[b, b + b_len)`.
#[must_use]
pub const fn ranges_overlap(a: usize, a_len: usize, b: usize, b_len: usize) -> bool {
    if a_len == 0 || b_len == 0 {
        return false;
    }
    b < a + a_len && a < b + b_len
}
