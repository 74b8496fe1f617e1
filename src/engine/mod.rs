//! Tag write pipeline.
//!
//! [`TagEngine`] owns the tag table, the event registry and the mapping
//! registry behind a single mutex. Every public operation holds that mutex
//! for its whole duration, so a write, the notifications it causes and the
//! chained mapping writes behind it form one atomic step.
//!
//! After a write is committed its events are checked first, then its
//! mappings are followed. A subscriber to a source tag is therefore notified
//! before any dependent tag changes.

mod write_path;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{TagError, TagResult, ValidationError};
use crate::events::notification::Notifier;
use crate::events::{EventId, EventInfo, EventKind, EventOptions};
use crate::handle::{TagHandle, TagIndex};
use crate::mapping::{MapId, MappingInfo, PropagationContext, PropagationReport};
use crate::storage::TagTable;
use crate::transport::{ModuleId, Transport};

use write_path::EngineState;

/// Outcome of one caller write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    /// Notifications delivered for the written tag itself.
    pub notified: usize,
    /// What the write's mappings did.
    pub propagation: PropagationReport,
    /// First error of a mapping chain that hit the hop limit. Only the
    /// over-limit writes were dropped; everything else is committed.
    #[serde(skip)]
    pub overflow: Option<TagError>,
}

impl WriteReport {
    /// Notifications delivered anywhere in the chain.
    #[must_use]
    pub const fn total_notified(&self) -> usize {
        self.notified + self.propagation.notified
    }
}

/// The serialized write pipeline tying storage, events and mappings
/// together.
pub struct TagEngine<T: TagTable> {
    cfg: EngineConfig,
    state: Mutex<EngineState<T>>,
    transport: Arc<dyn Transport>,
}

impl<T: TagTable> std::fmt::Debug for TagEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagEngine").field("cfg", &self.cfg).finish_non_exhaustive()
    }
}

impl<T: TagTable> TagEngine<T> {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new(table: T, transport: Arc<dyn Transport>) -> Self {
        Self {
            cfg: EngineConfig::default(),
            state: Mutex::new(EngineState::new(table)),
            transport,
        }
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(table: T, transport: Arc<dyn Transport>, cfg: EngineConfig) -> TagResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            state: Mutex::new(EngineState::new(table)),
            transport,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Run `f` against the tag table under the engine lock.
    ///
    /// This is how tags are created. Writes made here bypass events and
    /// mappings.
    pub fn with_table<R>(&self, f: impl FnOnce(&mut T) -> R) -> TagResult<R> {
        let mut st = self.lock()?;
        Ok(f(&mut st.table))
    }

    fn lock(&self) -> TagResult<MutexGuard<'_, EngineState<T>>> {
        self.state
            .lock()
            .map_err(|_| TagError::internal("engine state lock poisoned"))
    }

    fn notifier(&self) -> Notifier<'_> {
        Notifier {
            transport: self.transport.as_ref(),
            max_message_size: self.cfg.max_message_size,
        }
    }

    // ------------------------------------------------------------------
    // Tag data
    // ------------------------------------------------------------------

    /// Write `data` into tag `index` at byte `offset`, then notify and
    /// propagate.
    pub fn write(&self, index: TagIndex, offset: usize, data: &[u8]) -> TagResult<WriteReport> {
        let notifier = self.notifier();
        let mut st = self.lock()?;
        st.commit(index, offset, data, None)?;
        let notified = st.check_events(&notifier, index, offset, data.len());
        let mut ctx = PropagationContext::new(index, self.cfg.max_map_hops);
        let (propagation, overflow) = st.propagate(&mut ctx, &notifier, index, offset, data);
        Ok(WriteReport {
            notified,
            propagation,
            overflow,
        })
    }

    /// Write only the bits of `data` selected by `mask`, then notify and
    /// propagate the merged bytes.
    pub fn mask_write(
        &self,
        index: TagIndex,
        offset: usize,
        data: &[u8],
        mask: &[u8],
    ) -> TagResult<WriteReport> {
        if data.len() != mask.len() {
            return Err(ValidationError::TooBig {
                what: "write mask".to_string(),
                end: mask.len(),
                limit: data.len(),
            }
            .into());
        }
        let notifier = self.notifier();
        let mut st = self.lock()?;
        st.commit(index, offset, data, Some(mask))?;
        let notified = st.check_events(&notifier, index, offset, data.len());
        let merged = st.table.read(index, offset, data.len())?;
        let mut ctx = PropagationContext::new(index, self.cfg.max_map_hops);
        let (propagation, overflow) = st.propagate(&mut ctx, &notifier, index, offset, &merged);
        Ok(WriteReport {
            notified,
            propagation,
            overflow,
        })
    }

    /// Copy of `len` bytes of tag `index` starting at `offset`.
    pub fn read(&self, index: TagIndex, offset: usize, len: usize) -> TagResult<Vec<u8>> {
        let st = self.lock()?;
        Ok(st.table.read(index, offset, len)?)
    }

    /// Delete a tag.
    ///
    /// Its DELETED events fire first, then its events and mappings are
    /// dropped. Mappings on other tags that target it are removed the next
    /// time they propagate. Returns the notifications delivered.
    pub fn delete_tag(&self, index: TagIndex) -> TagResult<usize> {
        let notifier = self.notifier();
        let mut st = self.lock()?;
        let st = &mut *st;
        st.table.info(index)?;
        let notified = st.events.del_check(&st.table, index, &notifier)?;
        let events = st.events.del_all(index);
        let maps = st.maps.del_all(index);
        st.table.delete(index)?;
        tracing::info!(tag = %index, events, maps, notified, "tag deleted");
        Ok(notified)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register an event owned by `module`.
    pub fn event_add(
        &self,
        handle: TagHandle,
        kind: EventKind,
        operand: &[u8],
        module: ModuleId,
    ) -> TagResult<EventId> {
        let mut st = self.lock()?;
        let st = &mut *st;
        st.events.add(&st.table, handle, kind, operand, module)
    }

    /// Delete an event. Only the owning module may.
    pub fn event_del(&self, index: TagIndex, id: EventId, module: ModuleId) -> TagResult<()> {
        let mut st = self.lock()?;
        let st = &mut *st;
        st.events.del(&st.table, index, id, module)
    }

    /// Replace an event's options. Only the owning module may.
    pub fn event_opt(
        &self,
        index: TagIndex,
        id: EventId,
        options: EventOptions,
        module: ModuleId,
    ) -> TagResult<()> {
        let mut st = self.lock()?;
        let st = &mut *st;
        st.events.opt(&st.table, index, id, options, module)
    }

    pub fn event_get(&self, index: TagIndex, id: EventId) -> TagResult<EventInfo> {
        let st = self.lock()?;
        st.events.get(&st.table, index, id)
    }

    /// Events of a tag, newest first.
    pub fn events_of(&self, index: TagIndex) -> TagResult<Vec<EventInfo>> {
        let st = self.lock()?;
        st.events.events_of(&st.table, index)
    }

    /// Live events owned by `module`.
    pub fn event_count(&self, module: ModuleId) -> TagResult<usize> {
        Ok(self.lock()?.events.event_count(module))
    }

    /// Remove every event owned by `module`.
    pub fn events_cleanup(&self, module: ModuleId) -> TagResult<usize> {
        Ok(self.lock()?.events.cleanup(module))
    }

    /// Evaluate the events of `index` against the written range
    /// `[offset, offset + size)` without writing. Returns notifications
    /// delivered.
    pub fn event_check(&self, index: TagIndex, offset: usize, size: usize) -> TagResult<usize> {
        let notifier = self.notifier();
        let mut st = self.lock()?;
        let st = &mut *st;
        st.events.check(&st.table, index, offset, size, &notifier)
    }

    /// Fire the DELETED events of `index` without deleting it.
    pub fn event_del_check(&self, index: TagIndex) -> TagResult<usize> {
        let notifier = self.notifier();
        let st = self.lock()?;
        st.events.del_check(&st.table, index, &notifier)
    }

    /// Drop a module's events and disconnect it from the transport.
    pub fn disconnect_module(&self, module: ModuleId) -> TagResult<usize> {
        let removed = self.lock()?.events.cleanup(module);
        self.transport.disconnect(module);
        tracing::info!(module = %module, events = removed, "module disconnected");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Mappings
    // ------------------------------------------------------------------

    /// Map `source` onto `dest`.
    pub fn map_add(&self, source: TagHandle, dest: TagHandle) -> TagResult<MapId> {
        let mut st = self.lock()?;
        let st = &mut *st;
        st.maps.add(&st.table, source, dest)
    }

    pub fn map_del(&self, index: TagIndex, id: MapId) -> TagResult<()> {
        let mut st = self.lock()?;
        let st = &mut *st;
        st.maps.del(&st.table, index, id)
    }

    /// Remove every mapping of `index`. Returns how many were removed.
    pub fn map_del_all(&self, index: TagIndex) -> TagResult<usize> {
        Ok(self.lock()?.maps.del_all(index))
    }

    pub fn map_get(&self, index: TagIndex, id: MapId) -> TagResult<MappingInfo> {
        let st = self.lock()?;
        st.maps.get(&st.table, index, id)
    }

    /// Mappings of a tag, newest first.
    pub fn maps_of(&self, index: TagIndex) -> TagResult<Vec<MappingInfo>> {
        let st = self.lock()?;
        st.maps.maps_of(&st.table, index)
    }

    /// Propagate `data`, already committed at `offset` in `index`, through
    /// the tag's mappings.
    ///
    /// Unlike [`TagEngine::write`], running out of hops is an error here.
    pub fn map_check(&self, index: TagIndex, offset: usize, data: &[u8]) -> TagResult<PropagationReport> {
        let notifier = self.notifier();
        let mut st = self.lock()?;
        crate::events::registry::check_bounds(&st.table, index)?;
        let mut ctx = PropagationContext::new(index, self.cfg.max_map_hops);
        match st.propagate(&mut ctx, &notifier, index, offset, data) {
            (_, Some(err)) => Err(err),
            (report, None) => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::error::ErrorKind;
    use crate::storage::{MemoryTagTable, TagFlags};
    use crate::transport::ChannelTransport;

    const M1: ModuleId = ModuleId::new(1);

    fn engine() -> (TagEngine<MemoryTagTable>, Arc<ChannelTransport>) {
        let transport = Arc::new(ChannelTransport::new(64));
        let engine = TagEngine::new(MemoryTagTable::new(), transport.clone());
        (engine, transport)
    }

    fn add(engine: &TagEngine<MemoryTagTable>, name: &str, dt: DataType, count: usize) -> TagIndex {
        engine
            .with_table(|t| t.add_tag(name, dt, count, TagFlags::NONE))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn write_notifies_then_propagates() {
        let (engine, transport) = engine();
        let stream = transport.connect(M1).unwrap();
        let a = add(&engine, "a", DataType::Dint, 1);
        let b = add(&engine, "b", DataType::Dint, 1);
        let ha = engine.with_table(|t| t.handle(a)).unwrap().unwrap();
        let hb = engine.with_table(|t| t.handle(b)).unwrap().unwrap();
        engine.event_add(ha, EventKind::Write, &[], M1).unwrap();
        engine.event_add(hb, EventKind::Write, &[], M1).unwrap();
        engine.map_add(ha, hb).unwrap();

        let report = engine.write(a, 0, &5i32.to_le_bytes()).unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(report.propagation.applied, 1);
        assert_eq!(report.total_notified(), 2);
        assert!(report.overflow.is_none());
        assert_eq!(engine.read(b, 0, 4).unwrap(), 5i32.to_le_bytes().to_vec());

        let order: Vec<_> = stream.drain().unwrap().iter().map(|n| n.index).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn failed_write_notifies_nothing() {
        let (engine, transport) = engine();
        let stream = transport.connect(M1).unwrap();
        let a = add(&engine, "a", DataType::Int, 1);
        let ha = engine.with_table(|t| t.handle(a)).unwrap().unwrap();
        engine.event_add(ha, EventKind::Write, &[], M1).unwrap();
        let err = engine.write(a, 1, &[0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooBig);
        assert!(stream.try_recv().unwrap().is_none());
    }

    #[test]
    fn mask_write_requires_equal_lengths() {
        let (engine, _) = engine();
        let a = add(&engine, "a", DataType::Byte, 2);
        assert!(engine.mask_write(a, 0, &[1, 2], &[1]).is_err());
        engine.mask_write(a, 0, &[0xFF, 0xFF], &[0x0F, 0x00]).unwrap();
        assert_eq!(engine.read(a, 0, 2).unwrap(), vec![0x0F, 0x00]);
    }

    #[test]
    fn rejects_bad_config() {
        let cfg = EngineConfig {
            max_message_size: 4,
            ..EngineConfig::default()
        };
        let result = TagEngine::with_config(MemoryTagTable::new(), Arc::new(ChannelTransport::default()), cfg);
        assert!(result.is_err());
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<TagEngine<MemoryTagTable>>();
    }
}
