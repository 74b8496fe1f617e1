//! Tag datatypes.
//!
//! Every primitive datatype has a fixed wire code whose low nibble is the
//! base-2 logarithm of its width in bits (`BOOL` is 1 bit, `BYTE` 8 bits and so
//! on). Composite types are opaque here: they carry an identifier and their
//! byte layout belongs to the custom type system.

use std::fmt;

use serde::{Deserialize, Serialize};

/// High bit that marks a composite (custom) datatype code.
pub const CUSTOM_FLAG: u32 = 0x8000_0000;

/// The datatype of a tag or of a handle into a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Bool,
    Byte,
    Sint,
    Char,
    Word,
    Int,
    Uint,
    Dword,
    Dint,
    Udint,
    Time,
    Real,
    Lword,
    Lint,
    Ulint,
    Lreal,
    /// Composite type, identified by its index in the custom type table.
    Custom(u32),
}

/// Primitive datatypes in wire-code order.
pub const PRIMITIVES: [DataType; 16] = [
    DataType::Bool,
    DataType::Byte,
    DataType::Sint,
    DataType::Char,
    DataType::Word,
    DataType::Int,
    DataType::Uint,
    DataType::Dword,
    DataType::Dint,
    DataType::Udint,
    DataType::Time,
    DataType::Real,
    DataType::Lword,
    DataType::Lint,
    DataType::Ulint,
    DataType::Lreal,
];

impl DataType {
    /// The 32-bit wire code of this datatype.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Bool => 0x0010,
            Self::Byte => 0x0003,
            Self::Sint => 0x0013,
            Self::Char => 0x0023,
            Self::Word => 0x0004,
            Self::Int => 0x0014,
            Self::Uint => 0x0024,
            Self::Dword => 0x0005,
            Self::Dint => 0x0015,
            Self::Udint => 0x0025,
            Self::Time => 0x0035,
            Self::Real => 0x0045,
            Self::Lword => 0x0006,
            Self::Lint => 0x0016,
            Self::Ulint => 0x0026,
            Self::Lreal => 0x0036,
            Self::Custom(id) => id | CUSTOM_FLAG,
        }
    }

    /// Parse a wire code. Returns `None` for unknown primitive codes.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        if code & CUSTOM_FLAG != 0 {
            return Some(Self::Custom(code & !CUSTOM_FLAG));
        }
        PRIMITIVES.iter().copied().find(|t| t.code() == code)
    }

    /// Width of one element in bits, or `None` for composite types.
    #[must_use]
    pub const fn width_bits(self) -> Option<usize> {
        match self {
            Self::Custom(_) => None,
            other => Some(1 << (other.code() & 0x0F)),
        }
    }

    /// Width of one element in whole bytes. `BOOL` reports 0; composite
    /// types report `None`.
    #[must_use]
    pub const fn width_bytes(self) -> Option<usize> {
        match self.width_bits() {
            Some(bits) => Some(bits / 8),
            None => None,
        }
    }

    /// Number of bytes occupied by `count` elements of this type.
    ///
    /// Booleans are bit packed. Composite types need their element size from
    /// the custom type system and report `None`.
    #[must_use]
    pub const fn size_of(self, count: usize) -> Option<usize> {
        match self {
            Self::Bool => Some(count.div_ceil(8)),
            Self::Custom(_) => None,
            other => match other.width_bytes() {
                Some(width) => Some(width * count),
                None => None,
            },
        }
    }

    #[must_use]
    pub const fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Real | Self::Lreal)
    }

    #[must_use]
    pub const fn is_custom(self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// The canonical upper-case name, e.g. `DINT`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Byte => "BYTE",
            Self::Sint => "SINT",
            Self::Char => "CHAR",
            Self::Word => "WORD",
            Self::Int => "INT",
            Self::Uint => "UINT",
            Self::Dword => "DWORD",
            Self::Dint => "DINT",
            Self::Udint => "UDINT",
            Self::Time => "TIME",
            Self::Real => "REAL",
            Self::Lword => "LWORD",
            Self::Lint => "LINT",
            Self::Ulint => "ULINT",
            Self::Lreal => "LREAL",
            Self::Custom(_) => "CUSTOM",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(id) => write!(f, "CUSTOM({id})"),
            other => f.write_str(other.name()),
        }
    }
}
