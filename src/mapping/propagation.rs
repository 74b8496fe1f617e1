//! Propagation bookkeeping.
//!
//! One outermost tag write owns one [`PropagationContext`]. Each destination
//! write carries its depth in the mapping chain: writes caused directly by
//! the outermost write are at depth 1, writes they cause at depth 2, and so
//! on. A write deeper than the context's limit is refused; its siblings and
//! the rest of the propagation carry on.

use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, TagResult};
use crate::handle::TagIndex;

use super::map::MapId;

/// Origin and chain depth limit of one propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationContext {
    origin: TagIndex,
    deepest: usize,
    limit: usize,
}

impl PropagationContext {
    /// Start a propagation for a write on `origin`.
    #[must_use]
    pub const fn new(origin: TagIndex, limit: usize) -> Self {
        Self {
            origin,
            deepest: 0,
            limit,
        }
    }

    /// Tag whose write started the propagation.
    #[must_use]
    pub const fn origin(&self) -> TagIndex {
        self.origin
    }

    /// Deepest chain position written so far.
    #[must_use]
    pub const fn deepest(&self) -> usize {
        self.deepest
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Admit a destination write at chain position `depth`. Fails when
    /// `depth` exceeds the limit.
    pub fn enter(&mut self, depth: usize) -> TagResult<()> {
        if depth > self.limit {
            return Err(ExecutionError::HopLimitExceeded {
                origin: self.origin,
                limit: self.limit,
            }
            .into());
        }
        self.deepest = self.deepest.max(depth);
        Ok(())
    }
}

/// A destination write produced by a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingWrite {
    /// Source tag and mapping that produced the write.
    pub(crate) source: TagIndex,
    pub(crate) map: MapId,
    pub(crate) dest: TagIndex,
    pub(crate) offset: usize,
    pub(crate) data: Vec<u8>,
    /// Present for masked writes; same length as `data`.
    pub(crate) mask: Option<Vec<u8>>,
    /// Position in the mapping chain, starting at 1.
    pub(crate) depth: usize,
}

/// Outcome of propagating one write.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Destination writes committed.
    pub applied: usize,
    /// Mappings removed because their destination tag was deleted.
    pub removed: usize,
    /// Destination writes that failed for any other reason.
    pub failed: usize,
    /// Notifications delivered for destination writes.
    pub notified: usize,
    /// Destination writes refused because their chain was too deep.
    pub refused: usize,
    /// Longest mapping chain followed.
    pub depth: usize,
}
