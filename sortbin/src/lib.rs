#![deny(missing_docs, missing_debug_implementations)]

//! A type-indexed binary value encoding for ordered key-value stores.
//!
//! Every encoded value is paired with an out-of-band [`Type`] descriptor;
//! the codec dispatches on the descriptor's [`Kind`] to encode, decode, or
//! skip. Two per-call switches shape the wire form:
//!
//! - **descending** inverts every output byte, so descending logical order
//!   becomes ascending byte order;
//! - **comparable** selects encodings whose byte-lexicographic order equals
//!   the logical order of the decoded values, which is what makes the
//!   format usable as the key encoding of an ordered store.
//!
//! A third switch, **compatibility_mode**, frames struct fields with
//! ordinals and body sizes so descriptor revisions can evolve.
//!
//! # Encoding and decoding
//!
//! ```rust
//! use sortbin::{from_slice, to_vec, Type, Value, ValueOptions};
//!
//! let ty = Type::array(Type::String);
//! let value = Value::Array(vec![
//!     Value::String("ordered".into()),
//!     Value::String("store".into()),
//! ]);
//!
//! let bytes = to_vec(&ty, &value, ValueOptions::new()).unwrap();
//! let back = from_slice(&ty, &bytes, ValueOptions::new()).unwrap();
//! assert_eq!(back, value);
//! ```
//!
//! # Order preservation
//!
//! ```rust
//! use sortbin::{to_vec, Type, Value, ValueOptions};
//!
//! let opts = ValueOptions::new().with_comparable(true);
//! let small = to_vec(&Type::Int, &Value::Int(-5), opts).unwrap();
//! let large = to_vec(&Type::Int, &Value::Int(1_000_000), opts).unwrap();
//! assert!(small < large);
//! ```
//!
//! # Skipping
//!
//! Every kind supports advancing a stream past a value without
//! materializing it, given only its descriptor. Skip needs random access
//! within the visited stream prefix ([`read::ReadSeek`]); wrap a
//! forward-only transport in [`read::BufferedSeeker`] to get it.
//!
//! # Values with their types
//!
//! [`TypedValue`] pairs a value with its descriptor and exposes the whole
//! capability in one place: `encode`, `decode`, `marshal`, `unmarshal`,
//! `skip`, and a human-readable `Display`.

// Public mods
pub mod error;
pub mod kind;
pub mod options;
pub mod pool;
pub mod primitives;
pub mod read;
pub mod types;
pub mod value;

// Private mods
mod codec;

use std::io;

pub use error::{Error, ErrorKind};
pub use kind::Kind;
pub use options::ValueOptions;
pub use types::Type;
pub use value::{TypedValue, Value};

use read::{IoReader, ReadSeek, SliceReader};

/// Encodes `value` as `ty` into a fresh byte vector
pub fn to_vec(ty: &Type, value: &Value, opts: ValueOptions) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    codec::encode_value(ty, value, &mut out, opts)?;
    Ok(out)
}

/// Decodes one `ty` value from the front of `bytes`.
///
/// Trailing bytes are left untouched; pair with [`skip`] when the caller
/// needs to know where the value ended.
pub fn from_slice(ty: &Type, bytes: &[u8], opts: ValueOptions) -> Result<Value, Error> {
    let mut reader = SliceReader::new(bytes);
    let (value, _) = codec::decode_value(ty, &mut reader, opts)?;
    Ok(value)
}

/// Decodes one `ty` value off an IO stream
pub fn from_reader<R: io::Read>(ty: &Type, reader: R, opts: ValueOptions) -> Result<Value, Error> {
    let mut reader = IoReader::new(reader);
    let (value, _) = codec::decode_value(ty, &mut reader, opts)?;
    Ok(value)
}

/// Advances `reader` past one `ty` value without materializing it; returns
/// the number of bytes skipped
pub fn skip(ty: &Type, reader: &mut dyn ReadSeek, opts: ValueOptions) -> Result<usize, Error> {
    codec::skip_value(ty, reader, opts)
}
