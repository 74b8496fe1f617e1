//! # tagcore - event notification and data mapping for a tag database
//!
//! tagcore is the real-time core of an industrial tag server. Connected
//! modules read and write a shared table of named, typed data points
//! ("tags"). On every committed write the core:
//!
//! - evaluates the events registered on the written range and notifies
//!   their owning modules when a trigger condition holds, and
//! - follows the data mappings of the written range, copying the bytes (or
//!   individual bits) to linked tags, which in turn notify and propagate.
//!
//! ## Core Concepts
//!
//! - **Tag**: a typed, contiguous byte buffer addressed by [`TagIndex`]
//! - **Handle**: a byte/bit sub-range of a tag ([`TagHandle`])
//! - **Event**: a trigger condition on a handle, owned by a module
//! - **Mapping**: a propagation link from one handle to another
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tagcore::{ChannelTransport, DataType, EventKind, MemoryTagTable, ModuleId, TagEngine, TagFlags};
//!
//! let transport = Arc::new(ChannelTransport::default());
//! let engine = TagEngine::new(MemoryTagTable::new(), transport.clone());
//! let tag = engine.with_table(|t| t.add_tag("pump_speed", DataType::Real, 1, TagFlags::NONE))??;
//! let handle = engine.with_table(|t| t.handle(tag))??;
//!
//! let hmi = ModuleId::new(1);
//! let stream = transport.connect(hmi)?;
//! engine.event_add(handle, EventKind::Deadband, &2.0f32.to_le_bytes(), hmi)?;
//! engine.write(tag, 0, &13.0f32.to_le_bytes())?;
//! let note = stream.recv()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod bits;
pub mod compare;
pub mod config;
pub mod datatype;
pub mod error;
pub mod handle;

// Collaborators
pub mod storage;
pub mod transport;

// Engines
pub mod engine;
pub mod events;
pub mod mapping;

// Re-export primary types at crate root for convenience
pub use config::EngineConfig;
pub use datatype::DataType;
pub use engine::{TagEngine, WriteReport};
pub use error::{ErrorKind, ExecutionError, TagError, TagResult, TransportError, ValidationError};
pub use events::{EventId, EventInfo, EventKind, EventOptions, EventRegistry, Notification};
pub use handle::{TagHandle, TagIndex};
pub use mapping::{MapId, MapRegistry, MappingInfo, PropagationContext, PropagationReport};
pub use storage::{MemoryTagTable, StorageError, TagFlags, TagInfo, TagTable};
pub use transport::{ChannelTransport, ModuleId, NotificationStream, Transport};
