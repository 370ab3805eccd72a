//! Array encoding
//!
//! Variable-size arrays carry an ascending `Uint` element count unless the
//! call is comparable, in which case the concatenated element encodings are
//! framed with the same escape/terminator machinery as comparable strings.
//! Fixed-size arrays have no framing at all: the length is implicit, under
//! every option combination.
//!
//! Boolean elements are bit-packed eight to a byte wherever the element
//! count is knowable up front; a comparable variable-size boolean array
//! falls back to one byte per element because `ceil(n/8)` terminated bytes
//! cannot recover `n`.

use std::io::Write;

use bytes::BufMut;

use crate::error::Error;
use crate::kind::Kind;
use crate::options::ValueOptions;
use crate::pool;
use crate::read::{Read, ReadSeek, SliceReader};
use crate::types::{ArrayType, Type};
use crate::value::Value;

use super::primitive::write_all;
use super::text::{decode_escaped, encode_escaped, skip_escaped};
use super::varint::{decode_uint, encode_uint};
use super::{decode_value, encode_value, skip_value, Codec, MAX_PREALLOC};

/// Array codec
pub(crate) struct ArrayCodec;

impl ArrayCodec {
    fn descriptor(ty: &Type) -> Result<&ArrayType, Error> {
        match ty {
            Type::Array(at) => Ok(at),
            _ => Err(Error::invalid_type("array codec invoked with a non-array descriptor")),
        }
    }

    /// Bit-packing applies when the element count does not depend on the
    /// packed bytes themselves.
    fn packs_booleans(at: &ArrayType, opts: ValueOptions) -> bool {
        at.elem.resolve().kind() == Kind::Boolean && (at.fixed_size > 0 || !opts.comparable)
    }

    fn check_elements(at: &ArrayType, elems: &[Value]) -> Result<(), Error> {
        if at.elem.resolve().kind() == Kind::Undefined {
            return Err(Error::undefined("encode array element"));
        }
        if at.fixed_size > 0 && elems.len() != at.fixed_size {
            return Err(Error::missing_fixed_size(at.fixed_size, elems.len()));
        }
        for elem in elems {
            if !at.elem.admits(elem) {
                return Err(Error::mismatching(at.elem.kind(), elem.kind()));
            }
        }
        Ok(())
    }

    fn encode_packed_booleans(
        writer: &mut dyn Write,
        elems: &[Value],
        mask: u8,
    ) -> Result<usize, Error> {
        let mut n = 0;
        let mut byte = 0u8;
        let mut bit = 0;
        for elem in elems {
            let v = match elem {
                Value::Boolean(v) => *v,
                _ => return Err(Error::mismatching(Kind::Boolean, elem.kind())),
            };
            if v {
                byte |= 1 << bit;
            }
            bit += 1;
            if bit == 8 {
                n += write_all(writer, &[byte ^ mask])?;
                byte = 0;
                bit = 0;
            }
        }
        if bit > 0 {
            n += write_all(writer, &[byte ^ mask])?;
        }
        Ok(n)
    }

    fn decode_packed_booleans(
        reader: &mut dyn Read,
        count: usize,
        mask: u8,
    ) -> Result<(Vec<Value>, usize), Error> {
        let mut elems = Vec::with_capacity(count.min(MAX_PREALLOC));
        let mut n = 0;
        let mut byte = 0u8;
        for i in 0..count {
            if i % 8 == 0 {
                byte = reader.next()? ^ mask;
                n += 1;
            }
            elems.push(Value::Boolean((byte >> (i % 8)) & 1 == 1));
        }
        Ok((elems, n))
    }

    /// Body encoding shared by the headerless forms
    fn encode_body(
        at: &ArrayType,
        elems: &[Value],
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        if Self::packs_booleans(at, opts) {
            return Self::encode_packed_booleans(writer, elems, opts.mask());
        }
        let mut n = 0;
        for elem in elems {
            n += encode_value(&at.elem, elem, writer, opts)
                .map_err(|e| e.with_detail("bytes_before_failure", n))?;
        }
        Ok(n)
    }

    fn decode_counted(
        at: &ArrayType,
        count: usize,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Vec<Value>, usize), Error> {
        if Self::packs_booleans(at, opts) {
            return Self::decode_packed_booleans(reader, count, opts.mask());
        }
        let mut elems = Vec::with_capacity(count.min(MAX_PREALLOC));
        let mut n = 0;
        for _ in 0..count {
            let (elem, elem_n) = decode_value(&at.elem, reader, opts)
                .map_err(|e| e.with_detail("bytes_before_failure", n))?;
            elems.push(elem);
            n += elem_n;
        }
        Ok((elems, n))
    }

    fn skip_counted(
        at: &ArrayType,
        count: usize,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        if Self::packs_booleans(at, opts) {
            let bytes = count.div_ceil(8);
            reader.seek_ahead(bytes)?;
            return Ok(bytes);
        }
        if let Some(width) = at.elem.fixed_encoded_width(opts) {
            let bytes = count
                .checked_mul(width)
                .ok_or_else(|| Error::decoding("array span overflows"))?;
            reader.seek_ahead(bytes)?;
            return Ok(bytes);
        }
        let mut n = 0;
        for _ in 0..count {
            n += skip_value(&at.elem, reader, opts)?;
        }
        Ok(n)
    }
}

impl Codec for ArrayCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let at = Self::descriptor(ty)?;
        let elems = match value {
            Value::Array(elems) => elems,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        Self::check_elements(at, elems)?;

        // Fixed size: implicit length, elements back-to-back.
        if at.fixed_size > 0 {
            return Self::encode_body(at, elems, writer, opts);
        }

        if opts.comparable {
            // Elements into a scratch run, then escape-terminated framing.
            let mut run = pool::acquire(64);
            {
                let mut run_writer = (&mut *run).writer();
                Self::encode_body(at, elems, &mut run_writer, opts)?;
            }
            return encode_escaped(writer, run.iter().copied(), opts.mask());
        }

        // The element count header is ascending regardless of descending.
        let mut n = encode_uint(writer, elems.len() as u64, 0)?;
        n += Self::encode_body(at, elems, writer, opts)?;
        Ok(n)
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let at = Self::descriptor(ty)?;
        if at.elem.resolve().kind() == Kind::Undefined {
            return Err(Error::undefined("decode array element"));
        }

        if at.fixed_size > 0 {
            let (elems, n) = Self::decode_counted(at, at.fixed_size, reader, opts)?;
            return Ok((Value::Array(elems), n));
        }

        if opts.comparable {
            // Two-phase: pull the terminated run, count elements by
            // skipping across it, then decode for real.
            let (run, consumed) = decode_escaped(reader, opts.mask())?;
            let mut counter = SliceReader::new(&run);
            let mut count = 0usize;
            while !counter.is_empty() {
                let skipped = skip_value(&at.elem, &mut counter, opts)?;
                if skipped == 0 {
                    return Err(Error::decoding(
                        "zero-width elements are ambiguous in a comparable array",
                    ));
                }
                count += 1;
            }
            let mut elements = SliceReader::new(&run);
            let (elems, body_n) = Self::decode_counted(at, count, &mut elements, opts)?;
            if body_n != run.len() {
                return Err(Error::decoding("comparable array run has trailing bytes"));
            }
            return Ok((Value::Array(elems), consumed));
        }

        let (count, prefix_n) = decode_uint(reader, 0)?;
        let count = usize::try_from(count)
            .map_err(|_| Error::decoding("array count overflows").with_detail("count", count))?;
        let (elems, body_n) = Self::decode_counted(at, count, reader, opts)?;
        Ok((Value::Array(elems), prefix_n + body_n))
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let at = Self::descriptor(ty)?;
        if at.elem.resolve().kind() == Kind::Undefined {
            return Err(Error::undefined("skip array element"));
        }

        if at.fixed_size > 0 {
            return Self::skip_counted(at, at.fixed_size, reader, opts);
        }
        if opts.comparable {
            return skip_escaped(reader, opts.mask());
        }
        let (count, prefix_n) = decode_uint(reader.as_read(), 0)?;
        let count = usize::try_from(count)
            .map_err(|_| Error::decoding("array count overflows").with_detail("count", count))?;
        Ok(prefix_n + Self::skip_counted(at, count, reader, opts)?)
    }
}
