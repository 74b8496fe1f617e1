//! Event kinds and options.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype::DataType;

/// Trigger condition of an event.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Any write touching the range.
    Write,
    /// The range's bytes differ from the last observation.
    Change,
    /// A bit went from 0 to 1.
    Set,
    /// A bit went from 1 to 0.
    Reset,
    Equal,
    Greater,
    Less,
    /// An element moved at least the operand away from its last notified value.
    Deadband,
    /// The owning tag was deleted.
    Deleted,
}

impl EventKind {
    /// Every kind, in wire code order.
    pub const ALL: [Self; 9] = [
        Self::Write,
        Self::Change,
        Self::Set,
        Self::Reset,
        Self::Equal,
        Self::Greater,
        Self::Less,
        Self::Deadband,
        Self::Deleted,
    ];

    /// Wire code of this kind.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Write => 0x02,
            Self::Change => 0x03,
            Self::Set => 0x04,
            Self::Reset => 0x05,
            Self::Equal => 0x06,
            Self::Greater => 0x07,
            Self::Less => 0x08,
            Self::Deadband => 0x09,
            Self::Deleted => 0x0A,
        }
    }

    /// Kind for a wire code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Write => "WRITE",
            Self::Change => "CHANGE",
            Self::Set => "SET",
            Self::Reset => "RESET",
            Self::Equal => "EQUAL",
            Self::Greater => "GREATER",
            Self::Less => "LESS",
            Self::Deadband => "DEADBAND",
            Self::Deleted => "DELETED",
        }
    }

    /// Whether events of this kind may watch data of `datatype`.
    #[must_use]
    pub const fn compatible_with(self, datatype: DataType) -> bool {
        match self {
            Self::Write | Self::Change | Self::Deleted => true,
            Self::Set | Self::Reset => datatype.is_bool(),
            Self::Equal => !(datatype.is_bool() || datatype.is_float() || datatype.is_custom()),
            Self::Greater | Self::Less | Self::Deadband => {
                !(datatype.is_bool() || datatype.is_custom())
            }
        }
    }

    /// Whether this kind compares against a fixed operand.
    #[must_use]
    pub const fn needs_operand(self) -> bool {
        matches!(self, Self::Equal | Self::Greater | Self::Less | Self::Deadband)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Option bits of an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EventOptions: u32 {
        /// Include the event range's current bytes in each notification.
        const SEND_DATA = 0x01;
    }
}

impl Default for EventOptions {
    fn default() -> Self {
        Self::empty()
    }
}

impl EventOptions {
    #[must_use]
    pub const fn send_data(self) -> bool {
        self.contains(Self::SEND_DATA)
    }
}
