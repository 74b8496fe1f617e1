//! Event notification engine.
//!
//! Modules register events on tag ranges. After every committed write the
//! engine evaluates the events whose range the write touched and sends a
//! [`Notification`] to the owner of each event that fires.

/// Event records and ids.
pub mod event;
/// Event kinds and options.
pub mod kind;
/// Notification message codec.
pub mod notification;
/// Per-tag event lists.
pub mod registry;
/// Trigger evaluators.
pub mod triggers;

pub use event::{EventId, EventInfo};
pub use kind::{EventKind, EventOptions};
pub use notification::{Notification, EVENT_FLAG, HEADER_LEN};
pub use registry::EventRegistry;
