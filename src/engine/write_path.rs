//! Engine write path.
//!
//! Every write, whether it comes from a caller or from a mapping, goes
//! through the same three steps: commit the bytes, evaluate the tag's events,
//! then follow the tag's mappings. Mapping writes are kept on an explicit
//! stack instead of recursing; children are pushed above their remaining
//! siblings, so destinations are visited depth first in list order.

use crate::error::TagError;
use crate::events::notification::Notifier;
use crate::events::EventRegistry;
use crate::handle::TagIndex;
use crate::mapping::propagation::PendingWrite;
use crate::mapping::{MapRegistry, PropagationContext, PropagationReport};
use crate::storage::{StorageError, TagTable};

/// Everything the engine lock guards.
#[derive(Debug)]
pub(crate) struct EngineState<T> {
    pub(crate) table: T,
    pub(crate) events: EventRegistry,
    pub(crate) maps: MapRegistry,
}

impl<T: TagTable> EngineState<T> {
    pub(crate) fn new(table: T) -> Self {
        Self {
            table,
            events: EventRegistry::new(),
            maps: MapRegistry::new(),
        }
    }

    /// Commit bytes into a tag, masked or plain.
    pub(crate) fn commit(
        &mut self,
        index: TagIndex,
        offset: usize,
        data: &[u8],
        mask: Option<&[u8]>,
    ) -> Result<(), StorageError> {
        match mask {
            Some(mask) => self.table.mask_write(index, offset, data, mask),
            None => self.table.write(index, offset, data),
        }
    }

    /// Evaluate events for a committed range. Returns notifications
    /// delivered; evaluation errors are logged, never returned.
    pub(crate) fn check_events(
        &mut self,
        notifier: &Notifier<'_>,
        index: TagIndex,
        offset: usize,
        size: usize,
    ) -> usize {
        match self.events.check(&self.table, index, offset, size, notifier) {
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(tag = %index, error = %err, "event check failed");
                0
            }
        }
    }

    /// Follow the mappings of a committed write on `index`.
    ///
    /// A write deeper in its chain than the limit is dropped, along with the
    /// writes it would have caused; every other chain still runs. Returns the
    /// report and the first overflow error, if any.
    pub(crate) fn propagate(
        &mut self,
        ctx: &mut PropagationContext,
        notifier: &Notifier<'_>,
        index: TagIndex,
        offset: usize,
        data: &[u8],
    ) -> (PropagationReport, Option<TagError>) {
        let mut report = PropagationReport::default();
        let mut overflow = None;
        let mut pending = Vec::new();
        self.push_targets(&mut pending, index, offset, data, 0);

        while let Some(write) = pending.pop() {
            if let Err(err) = ctx.enter(write.depth) {
                tracing::error!(
                    origin = %ctx.origin(),
                    limit = ctx.limit(),
                    source = %write.source,
                    dest = %write.dest,
                    "Maximum number of chained mappings has been reached"
                );
                report.refused += 1;
                if overflow.is_none() {
                    overflow = Some(err);
                }
                continue;
            }
            self.apply(&mut pending, &mut report, notifier, write);
        }

        report.depth = ctx.deepest();
        (report, overflow)
    }

    fn apply(
        &mut self,
        pending: &mut Vec<PendingWrite>,
        report: &mut PropagationReport,
        notifier: &Notifier<'_>,
        write: PendingWrite,
    ) {
        let PendingWrite {
            source,
            map,
            dest,
            offset,
            data,
            mask,
            depth,
        } = write;
        match self.commit(dest, offset, &data, mask.as_deref()) {
            Ok(()) => {
                report.applied += 1;
                report.notified += self.check_events(notifier, dest, offset, data.len());
                if mask.is_some() {
                    // Downstream mappings see the merged destination bytes.
                    match self.table.read(dest, offset, data.len()) {
                        Ok(merged) => self.push_targets(pending, dest, offset, &merged, depth),
                        Err(err) => {
                            tracing::warn!(tag = %dest, error = %err, "cannot read back masked write");
                        }
                    }
                } else {
                    self.push_targets(pending, dest, offset, &data, depth);
                }
            }
            Err(StorageError::Deleted(_)) => {
                self.maps.remove(source, map);
                report.removed += 1;
                tracing::debug!(source = %source, map = %map, dest = %dest, "destination deleted, mapping removed");
            }
            Err(err) => {
                report.failed += 1;
                tracing::warn!(source = %source, map = %map, dest = %dest, error = %err, "mapped write failed");
            }
        }
    }

    /// Push the writes caused by `data` at `offset` on `index`, one level
    /// below `depth`, so that the first mapping in list order is popped first.
    fn push_targets(
        &self,
        pending: &mut Vec<PendingWrite>,
        index: TagIndex,
        offset: usize,
        data: &[u8],
        depth: usize,
    ) {
        let tag = self.table.data(index).unwrap_or_default();
        let targets = self.maps.plan(index, offset, data, tag);
        pending.extend(targets.into_iter().rev().map(|w| PendingWrite {
            depth: depth + 1,
            ..w
        }));
    }
}
