//! Event records.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bits;
use crate::error::{ExecutionError, TagResult, ValidationError};
use crate::handle::TagHandle;
use crate::transport::ModuleId;

use super::kind::{EventKind, EventOptions};
use super::triggers;

/// Identifier of an event, unique within its tag and never reused.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u32);

impl EventId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Retained evaluation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TriggerState {
    /// WRITE and DELETED keep nothing.
    Stateless,
    /// Last observed (CHANGE) or last notified (DEADBAND) value. Bit packed
    /// by element for BOOL data.
    Baseline(Vec<u8>),
    /// Per-element armed flags.
    Armed(Vec<u8>),
}

/// Read-only view of a registered event.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub id: EventId,
    pub handle: TagHandle,
    pub kind: EventKind,
    pub options: EventOptions,
    pub owner: ModuleId,
    /// Comparison operand, empty for kinds without one.
    pub operand: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct Event {
    pub(crate) id: EventId,
    pub(crate) handle: TagHandle,
    pub(crate) kind: EventKind,
    pub(crate) options: EventOptions,
    pub(crate) owner: ModuleId,
    operand: Vec<u8>,
    state: TriggerState,
}

impl Event {
    /// Build an event and seed its state from the tag's current bytes.
    ///
    /// The caller has already checked the kind against the handle's datatype.
    /// Operand bytes past one element are ignored.
    pub(crate) fn new(
        id: EventId,
        handle: TagHandle,
        kind: EventKind,
        operand: &[u8],
        owner: ModuleId,
        tag: &[u8],
    ) -> TagResult<Self> {
        let operand = match handle.datatype.width_bytes() {
            Some(width) if kind.needs_operand() => {
                let value = operand.get(..width).ok_or(ValidationError::MissingOperand {
                    kind,
                    expected: width,
                    actual: operand.len(),
                })?;
                let mut buf = alloc("event operand", width)?;
                buf.extend_from_slice(value);
                buf
            }
            _ => Vec::new(),
        };

        let start = bits::position(handle.byte, handle.bit);
        let state = match kind {
            EventKind::Write | EventKind::Deleted => TriggerState::Stateless,
            EventKind::Change if handle.datatype.is_bool() => {
                let mut buf = alloc("event state", bits::bitmap_len(handle.count))?;
                buf.resize(bits::bitmap_len(handle.count), 0);
                bits::copy(tag, start, &mut buf, 0, handle.count);
                TriggerState::Baseline(buf)
            }
            EventKind::Change | EventKind::Deadband => {
                let current = tag.get(handle.byte..handle.end()).ok_or_else(|| {
                    ValidationError::TooBig {
                        what: format!("event on tag {}", handle.index),
                        end: handle.end(),
                        limit: tag.len(),
                    }
                })?;
                let mut buf = alloc("event state", handle.size)?;
                buf.extend_from_slice(current);
                TriggerState::Baseline(buf)
            }
            EventKind::Set
            | EventKind::Reset
            | EventKind::Equal
            | EventKind::Greater
            | EventKind::Less => {
                let len = bits::bitmap_len(handle.count);
                let mut buf = alloc("event state", len)?;
                buf.resize(len, 0);
                TriggerState::Armed(buf)
            }
        };

        Ok(Self {
            id,
            handle,
            kind,
            options: EventOptions::empty(),
            owner,
            operand,
            state,
        })
    }

    /// Evaluate against the owning tag's whole buffer. DELETED events only
    /// fire through tag deletion, never here.
    pub(crate) fn evaluate(&mut self, tag: &[u8]) -> bool {
        let h = self.handle;
        let Some(current) = tag.get(h.byte..h.end()) else {
            return false;
        };
        let start = bits::position(h.byte, h.bit);
        match (self.kind, &mut self.state) {
            (EventKind::Write, _) => true,
            (EventKind::Deleted, _) => false,
            (EventKind::Change, TriggerState::Baseline(base)) if h.datatype.is_bool() => {
                triggers::change_bits(base, tag, start, h.count)
            }
            (EventKind::Change, TriggerState::Baseline(base)) => {
                triggers::change_bytes(base, current)
            }
            (EventKind::Set, TriggerState::Armed(armed)) => {
                triggers::edge_bits(armed, tag, start, h.count, true)
            }
            (EventKind::Reset, TriggerState::Armed(armed)) => {
                triggers::edge_bits(armed, tag, start, h.count, false)
            }
            (EventKind::Equal, TriggerState::Armed(armed)) => {
                triggers::edge_compare(armed, h.datatype, current, &self.operand, h.count, Ordering::Equal)
            }
            (EventKind::Greater, TriggerState::Armed(armed)) => {
                triggers::edge_compare(armed, h.datatype, current, &self.operand, h.count, Ordering::Greater)
            }
            (EventKind::Less, TriggerState::Armed(armed)) => {
                triggers::edge_compare(armed, h.datatype, current, &self.operand, h.count, Ordering::Less)
            }
            (EventKind::Deadband, TriggerState::Baseline(base)) => {
                triggers::deadband(base, h.datatype, current, &self.operand, h.count)
            }
            (kind, state) => {
                tracing::error!(kind = %kind, state = ?state, "event state does not match its kind");
                false
            }
        }
    }

    pub(crate) fn info(&self) -> EventInfo {
        EventInfo {
            id: self.id,
            handle: self.handle,
            kind: self.kind,
            options: self.options,
            owner: self.owner,
            operand: self.operand.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> &TriggerState {
        &self.state
    }
}

/// Empty buffer with room for `bytes`, or an allocation error.
pub(crate) fn alloc(what: &str, bytes: usize) -> TagResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| ExecutionError::AllocationFailed {
            what: what.to_string(),
            bytes,
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::handle::TagIndex;

    fn event(handle: TagHandle, kind: EventKind, operand: &[u8], tag: &[u8]) -> Event {
        Event::new(EventId::new(0), handle, kind, operand, ModuleId::new(1), tag).unwrap()
    }

    #[test]
    fn change_on_bool_seeds_from_tag_bits() {
        // Bits 3..6 of byte 0 are 1,0,1.
        let tag = [0b0010_1000u8];
        let h = TagHandle::bits(TagIndex::new(0), 0, 3, 3);
        let ev = event(h, EventKind::Change, &[], &tag);
        assert_eq!(ev.state(), &TriggerState::Baseline(vec![0b101]));
    }

    #[test]
    fn edge_kinds_start_disarmed() {
        let tag = [0xFFu8; 2];
        let h = TagHandle::bits(TagIndex::new(0), 0, 0, 9);
        let ev = event(h, EventKind::Set, &[], &tag);
        assert_eq!(ev.state(), &TriggerState::Armed(vec![0, 0]));
    }

    #[test]
    fn operand_is_trimmed_to_one_element() {
        let tag = [0u8; 8];
        let h = TagHandle::elements(TagIndex::new(0), DataType::Dint, 0, 2).unwrap();
        let ev = event(h, EventKind::Equal, &[1, 0, 0, 0, 9, 9], &tag);
        assert_eq!(ev.info().operand, vec![1, 0, 0, 0]);
    }

    #[test]
    fn change_on_bytes_fires_once_per_new_value() {
        let mut tag = [0u8; 4];
        let h = TagHandle::elements(TagIndex::new(0), DataType::Int, 1, 1).unwrap();
        let mut ev = event(h, EventKind::Change, &[], &tag);
        assert!(!ev.evaluate(&tag));
        tag[2] = 7;
        assert!(ev.evaluate(&tag));
        assert!(!ev.evaluate(&tag));
    }

    #[test]
    fn deleted_never_fires_on_writes() {
        let tag = [0u8; 1];
        let h = TagHandle::bits(TagIndex::new(0), 0, 0, 1);
        let mut ev = event(h, EventKind::Deleted, &[], &tag);
        assert!(!ev.evaluate(&tag));
    }

    #[test]
    fn alloc_reports_failure() {
        let err = alloc("huge", usize::MAX).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::AllocationFailure);
    }
}
