//! Data mapping propagation engine.
//!
//! A mapping links a source tag range to a destination range. Each committed
//! write touching the source range is copied to the destination, which is
//! itself a full tag write: it notifies the destination's events and follows
//! the destination's own mappings. Chain depth is bounded by the limit of a
//! [`PropagationContext`].
//!
//! BOOL sources carry a destination-aligned bit mask and are propagated with
//! a masked write, so only the mapped destination bits change.

/// Mapping records.
pub mod map;
/// Hop accounting and propagation reports.
pub mod propagation;
/// Per-tag mapping lists.
pub mod registry;

pub use map::{MapId, MappingInfo};
pub use propagation::{PropagationContext, PropagationReport};
pub use registry::MapRegistry;
