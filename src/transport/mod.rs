//! Notification transport for tagcore.
//!
//! The event engine hands every encoded notification to a [`Transport`]
//! addressed by [`ModuleId`]. The transport is the only place where delivery
//! can block or fail for reasons outside the engine; failures are reported
//! back as [`TransportError`] and never abort a tag write.
//!
//! [`ChannelTransport`] is the in-process implementation: each connected
//! module receives its notifications through a bounded channel exposed as a
//! [`NotificationStream`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Channel-backed transport.
pub mod channel;
/// Per-module receiving end.
pub mod stream;

pub use channel::ChannelTransport;
pub use stream::NotificationStream;

/// Identifier of one connected module.
///
/// Modules own the events they register; the id is the unit of
/// authorization for `event_del` and `event_opt`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery of opaque notification buffers to modules.
pub trait Transport: Send + Sync {
    /// Deliver one encoded message to `module`.
    fn send(&self, module: ModuleId, message: &[u8]) -> Result<(), TransportError>;

    /// Forget `module`. Messages already queued for it may still be drained.
    fn disconnect(&self, module: ModuleId);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_transport_object_safe(_: &dyn Transport) {}

    #[test]
    fn module_id_display() {
        assert_eq!(ModuleId::new(42).to_string(), "42");
        assert_eq!(ModuleId::new(42).get(), 42);
    }
}
