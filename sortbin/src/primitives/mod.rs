//! Definition of the primitive value types

use serde::{Deserialize, Serialize};

/// An absolute point in time.
///
/// category = fixed, width = 8
/// 64-bit two's-complement integer counting nanoseconds since the UTC unix
/// epoch, stored in the order-preserving signed form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a new [`Timestamp`] from nanoseconds since the UTC epoch
    pub fn from_nanoseconds(nanoseconds: i64) -> Self {
        Self(nanoseconds)
    }

    /// Nanoseconds since the UTC epoch
    pub fn nanoseconds(&self) -> i64 {
        self.0
    }

    /// Consume the wrapper into the inner i64
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(val: i64) -> Self {
        Self(val)
    }
}

/// A span of time.
///
/// category = fixed, width = 8
/// 64-bit two's-complement nanosecond count, stored in the order-preserving
/// signed form. Negative spans are representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration(i64);

impl Duration {
    /// Creates a new [`Duration`] from a nanosecond count
    pub fn from_nanoseconds(nanoseconds: i64) -> Self {
        Self(nanoseconds)
    }

    /// The nanosecond count
    pub fn nanoseconds(&self) -> i64 {
        self.0
    }

    /// Consume the wrapper into the inner i64
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl From<i64> for Duration {
    fn from(val: i64) -> Self {
        Self(val)
    }
}

/// A point in time paired with the zone it was observed in.
///
/// The instant is always UTC; the zone is an identity (for example an IANA
/// name), not an offset. When the declared type carries a fixed zone, only
/// the instant reaches the wire and the zone is supplied by the type on
/// decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTime {
    /// The instant, in UTC
    pub timestamp: Timestamp,

    /// The zone identity the instant belongs to
    pub zone: String,
}

impl DateTime {
    /// Creates a new [`DateTime`] from an instant and a zone identity
    pub fn new(timestamp: Timestamp, zone: impl Into<String>) -> Self {
        Self {
            timestamp,
            zone: zone.into(),
        }
    }
}

// Aliases for the scalar primitives to match those in the wire format
// documentation.

/// Represents a true or false value
///
/// category = fixed, width = 1
/// ascending: 0x01 is true and 0x00 is false; descending: 0xfe is true and
/// 0xff is false
pub type Boolean = bool;

/// Integer in the range 0 to 2^8-1 inclusive
///
/// category = fixed, width = 1
pub type Uint8 = u8;

/// Integer in the range 0 to 2^16-1 inclusive
///
/// category = fixed, width = 2, big-endian
pub type Uint16 = u16;

/// Integer in the range 0 to 2^32-1 inclusive
///
/// category = fixed, width = 4, big-endian
pub type Uint32 = u32;

/// Integer in the range 0 to 2^64-1 inclusive
///
/// category = fixed, width = 8, big-endian
pub type Uint64 = u64;

/// Integer in the range -(2^7) to 2^7-1 inclusive
///
/// category = fixed, width = 1, sign bit flipped
pub type Int8 = i8;

/// Integer in the range -(2^15) to 2^15-1 inclusive
///
/// category = fixed, width = 2, big-endian, sign bit flipped
pub type Int16 = i16;

/// Integer in the range -(2^31) to 2^31-1 inclusive
///
/// category = fixed, width = 4, big-endian, sign bit flipped
pub type Int32 = i32;

/// Integer in the range -(2^63) to 2^63-1 inclusive
///
/// category = fixed, width = 8, big-endian, sign bit flipped
pub type Int64 = i64;
