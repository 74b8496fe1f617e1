//! In-process transport over bounded crossbeam channels.
//!
//! `send` is called from inside the engine's write critical section, so it
//! never blocks: a full module queue drops the message and bumps a counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crossbeam_channel::{bounded, Sender, TrySendError};

use crate::config::EngineConfig;
use crate::error::{TagError, TagResult, TransportError};

use super::stream::NotificationStream;
use super::{ModuleId, Transport};

/// Transport delivering each module's notifications to its own stream.
#[derive(Debug)]
pub struct ChannelTransport {
    capacity: usize,
    modules: RwLock<HashMap<ModuleId, Sender<Vec<u8>>>>,
    dropped: AtomicU64,
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(EngineConfig::default().stream_capacity)
    }
}

impl ChannelTransport {
    /// Create a transport whose module streams buffer up to `capacity`
    /// messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            modules: RwLock::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Create a transport sized from the engine configuration.
    #[must_use]
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(cfg.stream_capacity)
    }

    /// Connect `module` and obtain the stream its notifications arrive on.
    ///
    /// Connecting an already connected module replaces its stream; the old
    /// stream drains what it already holds and then reports disconnection.
    pub fn connect(&self, module: ModuleId) -> TagResult<NotificationStream> {
        let (tx, rx) = bounded::<Vec<u8>>(self.capacity);
        let mut modules = self
            .modules
            .write()
            .map_err(|_| TagError::internal("transport module registry lock poisoned"))?;
        if modules.insert(module, tx).is_some() {
            tracing::debug!(module = %module, "replacing notification stream");
        }
        Ok(NotificationStream::new(module, rx))
    }

    /// Whether `module` currently has a stream.
    #[must_use]
    pub fn is_connected(&self, module: ModuleId) -> bool {
        self.modules
            .read()
            .map(|modules| modules.contains_key(&module))
            .unwrap_or(false)
    }

    /// Messages dropped because a module queue was full or its stream was
    /// gone.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, module: ModuleId, message: &[u8]) -> Result<(), TransportError> {
        let modules = self.modules.read().map_err(|_| TransportError::Disconnected {
            path: "transport_registry".to_string(),
        })?;
        let Some(tx) = modules.get(&module) else {
            return Err(TransportError::ModuleNotConnected { module });
        };
        match tx.try_send(message.to_vec()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(TransportError::QueueFull { module })
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(TransportError::Disconnected {
                    path: format!("module_{module}"),
                })
            }
        }
    }

    fn disconnect(&self, module: ModuleId) {
        match self.modules.write() {
            Ok(mut modules) => {
                if modules.remove(&module).is_some() {
                    tracing::debug!(module = %module, "module disconnected");
                }
            }
            Err(_) => tracing::error!(module = %module, "transport module registry lock poisoned"),
        }
    }
}
