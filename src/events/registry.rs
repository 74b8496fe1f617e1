//! Per-tag event lists.
//!
//! Each tag owns a list of events, newest first, plus a counter that hands
//! out event ids. The registry also keeps a live-event count per module so
//! that a disconnecting module's events can be swept without scanning every
//! tag.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::{ExecutionError, TagError, TagResult, ValidationError};
use crate::handle::{TagHandle, TagIndex};
use crate::storage::{TagInfo, TagTable};
use crate::transport::ModuleId;

use super::event::{Event, EventId, EventInfo};
use super::kind::{EventKind, EventOptions};
use super::notification::{Notification, Notifier};

#[derive(Debug, Default)]
struct TagEvents {
    next_id: u32,
    list: VecDeque<Event>,
}

/// Event lists of every tag.
#[derive(Debug, Default)]
pub struct EventRegistry {
    tags: BTreeMap<TagIndex, TagEvents>,
    owners: HashMap<ModuleId, usize>,
}

impl EventRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event on the tag addressed by `handle`.
    ///
    /// `operand` must hold at least one element for EQUAL, GREATER, LESS and
    /// DEADBAND; it is ignored for the other kinds.
    pub fn add<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        handle: TagHandle,
        kind: EventKind,
        operand: &[u8],
        owner: ModuleId,
    ) -> TagResult<EventId> {
        match self.insert(table, handle, kind, operand, owner) {
            Ok(id) => {
                tracing::debug!(
                    tag = %handle.index,
                    event = %id,
                    kind = %kind,
                    module = %owner,
                    byte = handle.byte,
                    size = handle.size,
                    "event added"
                );
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(tag = %handle.index, kind = %kind, module = %owner, error = %err, "event rejected");
                Err(err)
            }
        }
    }

    fn insert<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        handle: TagHandle,
        kind: EventKind,
        operand: &[u8],
        owner: ModuleId,
    ) -> TagResult<EventId> {
        let index = handle.index;
        let info = table.info(index)?;
        handle.validate_shape()?;
        check_virtual(&info, &handle, kind)?;
        if handle.end() > info.size {
            return Err(ValidationError::TooBig {
                what: format!("event on tag {index}"),
                end: handle.end(),
                limit: info.size,
            }
            .into());
        }
        if !kind.compatible_with(handle.datatype) {
            return Err(ValidationError::IncompatibleEventKind {
                kind,
                datatype: handle.datatype,
            }
            .into());
        }

        let entry = self.tags.entry(index).or_default();
        let next_id = entry.next_id.checked_add(1).ok_or(ExecutionError::IdsExhausted {
            index,
            what: "event".to_string(),
        })?;
        let id = EventId::new(entry.next_id);
        let event = Event::new(id, handle, kind, operand, owner, table.data(index)?)?;
        entry.next_id = next_id;
        entry.list.push_front(event);
        *self.owners.entry(owner).or_insert(0) += 1;
        Ok(id)
    }

    /// Remove an event. Only its owner may do so.
    pub fn del<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        index: TagIndex,
        id: EventId,
        module: ModuleId,
    ) -> TagResult<()> {
        check_bounds(table, index)?;
        let not_found = ExecutionError::EventNotFound { index, id };
        let list = &mut self.tags.get_mut(&index).ok_or(not_found.clone())?.list;
        let pos = list.iter().position(|ev| ev.id == id).ok_or(not_found)?;
        if list[pos].owner != module {
            return Err(ExecutionError::Unauthorized { module, index, id }.into());
        }
        if let Some(ev) = list.remove(pos) {
            self.release(ev.owner, 1);
            tracing::debug!(tag = %index, event = %id, module = %module, "event deleted");
        }
        Ok(())
    }

    /// Replace an event's options. Only its owner may do so; unknown bits are
    /// dropped.
    pub fn opt<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        index: TagIndex,
        id: EventId,
        options: EventOptions,
        module: ModuleId,
    ) -> TagResult<()> {
        check_bounds(table, index)?;
        let event = self
            .tags
            .get_mut(&index)
            .and_then(|e| e.list.iter_mut().find(|ev| ev.id == id))
            .ok_or(ExecutionError::EventNotFound { index, id })?;
        if event.owner != module {
            return Err(ExecutionError::Unauthorized { module, index, id }.into());
        }
        event.options = EventOptions::from_bits_truncate(options.bits());
        Ok(())
    }

    /// Snapshot of one event.
    pub fn get<T: TagTable + ?Sized>(
        &self,
        table: &T,
        index: TagIndex,
        id: EventId,
    ) -> TagResult<EventInfo> {
        check_bounds(table, index)?;
        self.tags
            .get(&index)
            .and_then(|e| e.list.iter().find(|ev| ev.id == id))
            .map(Event::info)
            .ok_or_else(|| ExecutionError::EventNotFound { index, id }.into())
    }

    /// Snapshots of a tag's events, newest first.
    pub fn events_of<T: TagTable + ?Sized>(
        &self,
        table: &T,
        index: TagIndex,
    ) -> TagResult<Vec<EventInfo>> {
        check_bounds(table, index)?;
        Ok(self
            .tags
            .get(&index)
            .map(|e| e.list.iter().map(Event::info).collect())
            .unwrap_or_default())
    }

    /// Live events owned by `module`.
    #[must_use]
    pub fn event_count(&self, module: ModuleId) -> usize {
        self.owners.get(&module).copied().unwrap_or(0)
    }

    /// Remove every event owned by `module`. Returns how many were removed.
    ///
    /// Tags are visited from the highest index down, since recent
    /// subscriptions tend to sit on recently created tags, and the sweep stops
    /// as soon as the module has no events left.
    pub fn cleanup(&mut self, module: ModuleId) -> usize {
        let mut remaining = self.event_count(module);
        let mut removed = 0;
        for (index, entry) in self.tags.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            let before = entry.list.len();
            entry.list.retain(|ev| ev.owner != module);
            let n = before - entry.list.len();
            if n > 0 {
                tracing::debug!(tag = %index, module = %module, removed = n, "module events removed");
            }
            remaining = remaining.saturating_sub(n);
            removed += n;
        }
        self.release(module, removed);
        removed
    }

    /// Remove every event of a tag. Returns how many were removed.
    pub fn del_all(&mut self, index: TagIndex) -> usize {
        let Some(entry) = self.tags.get_mut(&index) else {
            return 0;
        };
        let events = std::mem::take(&mut entry.list);
        for ev in &events {
            self.release(ev.owner, 1);
        }
        events.len()
    }

    /// Evaluate every event of `index` whose range intersects the written
    /// range `[offset, offset + size)` and notify the owners of those that
    /// fire. Returns the number of notifications delivered.
    pub(crate) fn check<T: TagTable + ?Sized>(
        &mut self,
        table: &T,
        index: TagIndex,
        offset: usize,
        size: usize,
        notifier: &Notifier<'_>,
    ) -> TagResult<usize> {
        check_bounds(table, index)?;
        let Some(entry) = self.tags.get_mut(&index) else {
            return Ok(0);
        };
        if size == 0 || entry.list.is_empty() {
            return Ok(0);
        }
        let data = table.data(index)?;
        let mut delivered = 0;
        for ev in &mut entry.list {
            if ev.kind == EventKind::Deleted || !ev.handle.overlaps(offset, size) {
                continue;
            }
            if ev.evaluate(data) && notifier.deliver(ev.owner, &notification(index, ev, data)) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Fire every DELETED event of `index`. Called before the tag is removed
    /// from the table.
    pub(crate) fn del_check<T: TagTable + ?Sized>(
        &self,
        table: &T,
        index: TagIndex,
        notifier: &Notifier<'_>,
    ) -> TagResult<usize> {
        check_bounds(table, index)?;
        let Some(entry) = self.tags.get(&index) else {
            return Ok(0);
        };
        let data = table.data(index).unwrap_or_default();
        Ok(entry
            .list
            .iter()
            .filter(|ev| ev.kind == EventKind::Deleted)
            .filter(|ev| notifier.deliver(ev.owner, &notification(index, ev, data)))
            .count())
    }

    fn release(&mut self, module: ModuleId, n: usize) {
        if n == 0 {
            return;
        }
        if let Some(count) = self.owners.get_mut(&module) {
            *count = count.saturating_sub(n);
            if *count == 0 {
                self.owners.remove(&module);
            }
        }
    }
}

fn notification(index: TagIndex, ev: &Event, tag: &[u8]) -> Notification {
    let data = if ev.options.send_data() {
        tag.get(ev.handle.byte..ev.handle.end())
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    Notification {
        index,
        id: ev.id,
        kind: ev.kind,
        data,
    }
}

pub(crate) fn check_bounds<T: TagTable + ?Sized>(table: &T, index: TagIndex) -> TagResult<()> {
    if index.as_usize() >= table.len() {
        return Err(ValidationError::IndexOutOfBounds {
            index,
            len: table.len(),
        }
        .into());
    }
    Ok(())
}

/// Virtual tags only host WRITE events on queue tags, covering the whole tag.
fn check_virtual(info: &TagInfo, handle: &TagHandle, kind: EventKind) -> Result<(), TagError> {
    if !info.flags.is_virtual {
        return Ok(());
    }
    let reason = if !info.flags.is_queue {
        "events are not allowed on virtual tags"
    } else if kind != EventKind::Write {
        "queue tags only allow WRITE events"
    } else if handle.byte != 0 || handle.size != info.size {
        "WRITE events on queue tags must cover the whole tag"
    } else {
        return Ok(());
    };
    Err(ValidationError::IllegalOnTagKind {
        index: info.index,
        reason: reason.to_string(),
    }
    .into())
}
