//! The closed set of type tags

use std::convert::TryFrom;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Tag of every supported type.
///
/// The discriminants are part of the wire format: a descriptor encodes its
/// kind as this byte, and the codec dispatch table is indexed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    /// The absent type; rejects every operation
    Undefined = 0x00,

    /// One-byte true/false
    Boolean = 0x01,

    /// Variable-length signed integer
    Int = 0x02,

    /// 8-bit signed integer
    Int8 = 0x03,

    /// 16-bit signed integer
    Int16 = 0x04,

    /// 32-bit signed integer
    Int32 = 0x05,

    /// 64-bit signed integer
    Int64 = 0x06,

    /// Variable-length unsigned integer
    Uint = 0x07,

    /// 8-bit unsigned integer
    Uint8 = 0x08,

    /// 16-bit unsigned integer
    Uint16 = 0x09,

    /// 32-bit unsigned integer
    Uint32 = 0x0a,

    /// 64-bit unsigned integer
    Uint64 = 0x0b,

    /// IEEE 754 binary32 in order-preserving form
    Float32 = 0x0c,

    /// IEEE 754 binary64 in order-preserving form
    Float64 = 0x0d,

    /// UTF-8 string
    String = 0x0e,

    /// Raw byte buffer, optionally of a fixed size
    Bytes = 0x0f,

    /// Signed nanosecond count
    Duration = 0x10,

    /// Nanoseconds since the UTC epoch
    Timestamp = 0x11,

    /// Timestamp with a zone identity
    DateTime = 0x12,

    /// Closed set of named unsigned constants
    Enum = 0x13,

    /// Homogeneous sequence
    Array = 0x14,

    /// Ordered unique-key mapping
    Map = 0x15,

    /// Fixed field tuple in declaration order
    Struct = 0x16,

    /// A value or the null sentinel
    Nullable = 0x17,

    /// One variant out of a declared list
    OneOf = 0x18,

    /// Labeling indirection; behaves as its inner type
    Named = 0x19,

    /// Self-describing pair of descriptor and value
    Any = 0x1a,
}

/// Number of kinds; the dispatch table has one slot per kind.
pub(crate) const KIND_COUNT: usize = 0x1b;

impl Kind {
    /// All kinds in discriminant order
    pub const ALL: [Kind; KIND_COUNT] = [
        Kind::Undefined,
        Kind::Boolean,
        Kind::Int,
        Kind::Int8,
        Kind::Int16,
        Kind::Int32,
        Kind::Int64,
        Kind::Uint,
        Kind::Uint8,
        Kind::Uint16,
        Kind::Uint32,
        Kind::Uint64,
        Kind::Float32,
        Kind::Float64,
        Kind::String,
        Kind::Bytes,
        Kind::Duration,
        Kind::Timestamp,
        Kind::DateTime,
        Kind::Enum,
        Kind::Array,
        Kind::Map,
        Kind::Struct,
        Kind::Nullable,
        Kind::OneOf,
        Kind::Named,
        Kind::Any,
    ];
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl TryFrom<u8> for Kind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0x00 => Kind::Undefined,
            0x01 => Kind::Boolean,
            0x02 => Kind::Int,
            0x03 => Kind::Int8,
            0x04 => Kind::Int16,
            0x05 => Kind::Int32,
            0x06 => Kind::Int64,
            0x07 => Kind::Uint,
            0x08 => Kind::Uint8,
            0x09 => Kind::Uint16,
            0x0a => Kind::Uint32,
            0x0b => Kind::Uint64,
            0x0c => Kind::Float32,
            0x0d => Kind::Float64,
            0x0e => Kind::String,
            0x0f => Kind::Bytes,
            0x10 => Kind::Duration,
            0x11 => Kind::Timestamp,
            0x12 => Kind::DateTime,
            0x13 => Kind::Enum,
            0x14 => Kind::Array,
            0x15 => Kind::Map,
            0x16 => Kind::Struct,
            0x17 => Kind::Nullable,
            0x18 => Kind::OneOf,
            0x19 => Kind::Named,
            0x1a => Kind::Any,
            _ => {
                return Err(Error::decoding("invalid kind byte").with_detail("byte", value));
            }
        };
        Ok(kind)
    }
}
