//! String and byte-buffer encodings
//!
//! Two framings, selected by `comparable`:
//!
//! - length-prefixed: a `Uint` length followed by the payload;
//! - escape-terminated: the payload followed by a two-byte terminator, with
//!   any payload byte equal to the terminator's sentinel expanded to a
//!   two-byte escape so the terminator stays unique. Ascending the
//!   sentinel is `0x00`, the escape `0x00 0xff` and the terminator
//!   `0x00 0x01`; descending inverts all three.
//!
//! Fixed-size byte buffers are raw with no framing at all.

use std::io::Write;

use serde_bytes::ByteBuf;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::pool;
use crate::read::{Read, ReadSeek};
use crate::types::Type;
use crate::value::Value;

use super::primitive::write_all;
use super::varint::{decode_uint, encode_uint};
use super::{Codec, MAX_PREALLOC};

/// Bytes pulled per chunk when the declared length is untrusted
const READ_CHUNK: usize = 64 * 1024;

/// Encode a length-prefixed payload; prefix and payload share the mask
pub(crate) fn encode_len_prefixed(
    writer: &mut dyn Write,
    payload: &[u8],
    mask: u8,
) -> Result<usize, Error> {
    let mut n = encode_uint(writer, payload.len() as u64, mask)?;
    if mask == 0 {
        n += write_all(writer, payload)?;
    } else {
        let mut buf = pool::acquire(payload.len());
        buf.extend(payload.iter().map(|b| *b ^ mask));
        n += write_all(writer, &buf)?;
    }
    Ok(n)
}

/// Decode a length-prefixed payload; returns unmasked bytes and the total
/// consumed count
pub(crate) fn decode_len_prefixed(
    reader: &mut dyn Read,
    mask: u8,
) -> Result<(Vec<u8>, usize), Error> {
    let (len, prefix_n) = decode_uint(reader, mask)?;
    let len = usize::try_from(len)
        .map_err(|_| Error::decoding("length prefix overflows").with_detail("length", len))?;

    let mut payload = Vec::with_capacity(len.min(MAX_PREALLOC));
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(READ_CHUNK);
        let start = payload.len();
        payload.resize(start + chunk, 0);
        reader.read_exact(&mut payload[start..])?;
        remaining -= chunk;
    }
    if mask != 0 {
        for b in &mut payload {
            *b ^= mask;
        }
    }
    Ok((payload, prefix_n + len))
}

/// Advance past a length-prefixed payload
pub(crate) fn skip_len_prefixed(reader: &mut dyn ReadSeek, mask: u8) -> Result<usize, Error> {
    let (len, prefix_n) = decode_uint(reader.as_read(), mask)?;
    let len = usize::try_from(len)
        .map_err(|_| Error::decoding("length prefix overflows").with_detail("length", len))?;
    reader.seek_ahead(len)?;
    Ok(prefix_n + len)
}

/// Write an escape-terminated run.
///
/// `masked` must yield bytes that already carry the descending mask; the
/// function only expands sentinel occurrences and appends the terminator.
pub(crate) fn encode_escaped(
    writer: &mut dyn Write,
    masked: impl Iterator<Item = u8>,
    mask: u8,
) -> Result<usize, Error> {
    let sentinel = mask;
    let escape = 0xff ^ mask;
    let terminator = 0x01 ^ mask;

    let (low, _) = masked.size_hint();
    let mut out = pool::acquire(low + 2);
    for b in masked {
        if b == sentinel {
            out.extend_from_slice(&[sentinel, escape]);
        } else {
            out.extend_from_slice(&[b]);
        }
    }
    out.extend_from_slice(&[sentinel, terminator]);
    write_all(writer, &out)
}

/// Read an escape-terminated run back into its masked bytes.
///
/// Returns the run with escapes collapsed (still carrying the mask) and the
/// total consumed count including escapes and terminator.
pub(crate) fn decode_escaped(reader: &mut dyn Read, mask: u8) -> Result<(Vec<u8>, usize), Error> {
    let sentinel = mask;
    let escape = 0xff ^ mask;
    let terminator = 0x01 ^ mask;

    let mut out = Vec::new();
    let mut n = 0;
    loop {
        let b = reader.next()?;
        n += 1;
        if b != sentinel {
            out.push(b);
            continue;
        }
        let c = reader.next()?;
        n += 1;
        if c == terminator {
            break;
        }
        if c == escape {
            out.push(sentinel);
        } else {
            return Err(Error::decoding("invalid escape sequence").with_detail("byte", c));
        }
    }
    Ok((out, n))
}

/// Advance past an escape-terminated run without materializing it
pub(crate) fn skip_escaped(reader: &mut dyn ReadSeek, mask: u8) -> Result<usize, Error> {
    let sentinel = mask;
    let escape = 0xff ^ mask;
    let terminator = 0x01 ^ mask;

    let mut n = 0;
    loop {
        let b = reader.next()?;
        n += 1;
        if b != sentinel {
            continue;
        }
        let c = reader.next()?;
        n += 1;
        if c == terminator {
            return Ok(n);
        }
        if c != escape {
            return Err(Error::decoding("invalid escape sequence").with_detail("byte", c));
        }
    }
}

/// String and Bytes codec
pub(crate) struct TextCodec;

impl TextCodec {
    fn payload_of<'v>(ty: &Type, value: &'v Value) -> Result<&'v [u8], Error> {
        match (ty, value) {
            (Type::String, Value::String(s)) => Ok(s.as_bytes()),
            (Type::Bytes { .. }, Value::Bytes(b)) => Ok(b),
            _ => Err(Error::mismatching(ty.kind(), value.kind())),
        }
    }

    fn materialize(ty: &Type, payload: Vec<u8>) -> Result<Value, Error> {
        match ty {
            Type::String => {
                let s = String::from_utf8(payload)
                    .map_err(|_| Error::decoding("string payload is not valid UTF-8"))?;
                Ok(Value::String(s))
            }
            Type::Bytes { .. } => Ok(Value::Bytes(ByteBuf::from(payload))),
            _ => Err(Error::invalid_type("text codec invoked with a non-text descriptor")),
        }
    }
}

impl Codec for TextCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let payload = Self::payload_of(ty, value)?;
        let m = opts.mask();

        if let Type::Bytes { fixed_size } = ty {
            if *fixed_size > 0 {
                if payload.len() != *fixed_size {
                    return Err(Error::missing_fixed_size(*fixed_size, payload.len()));
                }
                if m == 0 {
                    return write_all(writer, payload);
                }
                let mut buf = pool::acquire(payload.len());
                buf.extend(payload.iter().map(|b| *b ^ m));
                return write_all(writer, &buf);
            }
        }

        if opts.comparable {
            encode_escaped(writer, payload.iter().map(|b| *b ^ m), m)
        } else {
            encode_len_prefixed(writer, payload, m)
        }
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let m = opts.mask();

        if let Type::Bytes { fixed_size } = ty {
            if *fixed_size > 0 {
                let mut payload = reader.read_bytes(*fixed_size)?;
                if m != 0 {
                    for b in &mut payload {
                        *b ^= m;
                    }
                }
                return Ok((Value::Bytes(ByteBuf::from(payload)), *fixed_size));
            }
        }

        if opts.comparable {
            let (mut payload, n) = decode_escaped(reader, m)?;
            if m != 0 {
                for b in &mut payload {
                    *b ^= m;
                }
            }
            Ok((Self::materialize(ty, payload)?, n))
        } else {
            let (payload, n) = decode_len_prefixed(reader, m)?;
            Ok((Self::materialize(ty, payload)?, n))
        }
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        if let Type::Bytes { fixed_size } = ty {
            if *fixed_size > 0 {
                reader.seek_ahead(*fixed_size)?;
                return Ok(*fixed_size);
            }
        }
        if opts.comparable {
            skip_escaped(reader, opts.mask())
        } else {
            skip_len_prefixed(reader, opts.mask())
        }
    }
}
