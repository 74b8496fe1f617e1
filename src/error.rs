//! Error types for tagcore.
//!
//! All errors in tagcore are strongly typed using thiserror.
//! This enables pattern matching on specific error conditions
//! and provides clear error messages. Callers that only care about the
//! abstract category of a failure use [`TagError::kind`].

use thiserror::Error;

use crate::datatype::DataType;
use crate::events::{EventId, EventKind};
use crate::handle::TagIndex;
use crate::mapping::MapId;
use crate::storage::StorageError;
use crate::transport::ModuleId;

/// Validation errors detected before any state is mutated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Tag index {index} is out of bounds (table holds {len} tags)")]
    IndexOutOfBounds {
        index: TagIndex,
        len: usize,
    },

    #[error("Operation is illegal on tag {index}: {reason}")]
    IllegalOnTagKind {
        index: TagIndex,
        reason: String,
    },

    #[error("Range of {what} ends at byte {end} but the limit is {limit}")]
    TooBig {
        what: String,
        end: usize,
        limit: usize,
    },

    #[error("Tag {index} is read only")]
    ReadOnly {
        index: TagIndex,
    },

    #[error("{kind} events are not allowed for {datatype} data")]
    IncompatibleEventKind {
        kind: EventKind,
        datatype: DataType,
    },

    #[error("{kind} events need an operand of {expected} bytes, got {actual}")]
    MissingOperand {
        kind: EventKind,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid handle: {reason}")]
    InvalidHandle {
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors that occur while operating on registered state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Event {id} not found on tag {index}")]
    EventNotFound {
        index: TagIndex,
        id: EventId,
    },

    #[error("Mapping {id} not found on tag {index}")]
    MappingNotFound {
        index: TagIndex,
        id: MapId,
    },

    #[error("Module {module} does not own event {id} on tag {index}")]
    Unauthorized {
        module: ModuleId,
        index: TagIndex,
        id: EventId,
    },

    #[error("Unable to allocate {bytes} bytes for {what}")]
    AllocationFailed {
        what: String,
        bytes: usize,
    },

    #[error("Maximum number of chained mappings ({limit}) reached for tag {origin}")]
    HopLimitExceeded {
        origin: TagIndex,
        limit: usize,
    },

    #[error("Tag {index} has no {what} ids left")]
    IdsExhausted {
        index: TagIndex,
        what: String,
    },

    #[error("Tag {index} has been deleted")]
    TagDeleted {
        index: TagIndex,
    },

    #[error("Message of {size} bytes exceeds the maximum of {max}")]
    MessageTooBig {
        size: usize,
        max: usize,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },
}

/// Transport errors for notification delivery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Module {module} is not connected")]
    ModuleNotConnected {
        module: ModuleId,
    },

    #[error("Notification queue for module {module} is full")]
    QueueFull {
        module: ModuleId,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Malformed notification: {reason}")]
    Malformed {
        reason: String,
    },
}

/// Abstract error categories surfaced to callers.
///
/// These are stable, transport-independent kinds; they carry no wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgumentOutOfBounds,
    IllegalOnTagKind,
    TooBig,
    NotFound,
    Unauthorized,
    AllocationFailure,
    Overflow,
    Deleted,
    ReadOnly,
    InvalidArgument,
    Transport,
    Internal,
}

/// Top-level error type for tagcore.
///
/// This enum encompasses all possible errors that can occur
/// when using tagcore.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TagError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl TagError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// The abstract category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(e) => match e {
                ValidationError::IndexOutOfBounds { .. } => ErrorKind::ArgumentOutOfBounds,
                ValidationError::IllegalOnTagKind { .. } => ErrorKind::IllegalOnTagKind,
                ValidationError::TooBig { .. } => ErrorKind::TooBig,
                ValidationError::ReadOnly { .. } => ErrorKind::ReadOnly,
                ValidationError::IncompatibleEventKind { .. }
                | ValidationError::MissingOperand { .. }
                | ValidationError::InvalidHandle { .. }
                | ValidationError::InvalidConfig { .. } => ErrorKind::InvalidArgument,
            },
            Self::Execution(e) => match e {
                ExecutionError::EventNotFound { .. } | ExecutionError::MappingNotFound { .. } => {
                    ErrorKind::NotFound
                }
                ExecutionError::Unauthorized { .. } => ErrorKind::Unauthorized,
                ExecutionError::AllocationFailed { .. } => ErrorKind::AllocationFailure,
                ExecutionError::HopLimitExceeded { .. } | ExecutionError::IdsExhausted { .. } => {
                    ErrorKind::Overflow
                }
                ExecutionError::TagDeleted { .. } => ErrorKind::Deleted,
                ExecutionError::MessageTooBig { .. } => ErrorKind::TooBig,
                ExecutionError::Storage { .. } => ErrorKind::Internal,
            },
            Self::Transport(_) => ErrorKind::Transport,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<StorageError> for TagError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OutOfBounds { index, len } => {
                Self::Validation(ValidationError::IndexOutOfBounds { index, len })
            }
            StorageError::Deleted(index) => Self::Execution(ExecutionError::TagDeleted { index }),
            StorageError::RangeTooBig { index, end, size } => {
                Self::Validation(ValidationError::TooBig {
                    what: format!("tag {index}"),
                    end,
                    limit: size,
                })
            }
            StorageError::Illegal { index, reason } => {
                Self::Validation(ValidationError::IllegalOnTagKind { index, reason })
            }
            StorageError::DuplicateName(name) => Self::Execution(ExecutionError::Storage {
                message: format!("duplicate tag name '{name}'"),
            }),
            StorageError::Backend(message) => Self::Execution(ExecutionError::Storage { message }),
        }
    }
}

/// Result type alias for tagcore operations.
pub type TagResult<T> = Result<T, TagError>;
