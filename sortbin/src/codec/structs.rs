//! Struct encoding
//!
//! Packed mode writes fields back-to-back in declared order with no
//! framing; runs of boolean fields collapse into packed bits. Compatibility
//! mode frames every field as `{ordinal, body_size, body}` behind a header
//! naming the largest ordinal, so consumers with a different descriptor
//! revision can skip unknown fields and default missing ones.

use std::collections::BTreeMap;
use std::io::Write;

use bytes::BufMut;

use crate::error::Error;
use crate::kind::Kind;
use crate::options::ValueOptions;
use crate::pool;
use crate::read::{Read, ReadSeek};
use crate::types::{Field, IndexWidth, StructType, Type};
use crate::value::Value;

use super::primitive::{read_index, write_all, write_index};
use super::varint::{decode_uint, encode_uint};
use super::{decode_value, encode_value, skip_value, Codec};

/// Struct codec
pub(crate) struct StructCodec;

impl StructCodec {
    fn descriptor(ty: &Type) -> Result<&StructType, Error> {
        match ty {
            Type::Struct(st) => Ok(st),
            _ => Err(Error::invalid_type("struct codec invoked with a non-struct descriptor")),
        }
    }

    fn arity_check(st: &StructType, values: &[Value]) -> Result<(), Error> {
        if values.len() != st.fields.len() {
            return Err(Error::new(
                crate::error::ErrorKind::MismatchingValueType,
                "struct value arity disagrees with the declared fields",
            )
            .with_detail("declared", st.fields.len())
            .with_detail("found", values.len()));
        }
        Ok(())
    }

    fn is_boolean(field: &Field) -> bool {
        field.ty.resolve().kind() == Kind::Boolean
    }

    /// Field ordinals keyed to their declaration index; duplicates are a
    /// descriptor bug.
    fn ordinals(st: &StructType) -> Result<BTreeMap<u64, usize>, Error> {
        let mut map = BTreeMap::new();
        for (i, field) in st.fields.iter().enumerate() {
            if field.ordinal == 0 {
                return Err(Error::invalid_type("struct field ordinal must be positive")
                    .with_detail("field", &field.name));
            }
            if map.insert(field.ordinal as u64, i).is_some() {
                return Err(Error::invalid_type("duplicate struct field ordinal")
                    .with_detail("ordinal", field.ordinal));
            }
        }
        Ok(map)
    }

    fn header_width(max_ordinal: u64) -> IndexWidth {
        if max_ordinal <= u8::MAX as u64 {
            IndexWidth::One
        } else if max_ordinal <= u16::MAX as u64 {
            IndexWidth::Two
        } else if max_ordinal <= u32::MAX as u64 {
            IndexWidth::Four
        } else {
            IndexWidth::Eight
        }
    }

    fn encode_packed(
        st: &StructType,
        values: &[Value],
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let mut n = 0;
        let mut bit_buffer = 0u8;
        let mut bit_pos = 0u8;

        for (field, value) in st.fields.iter().zip(values) {
            let field_opts = opts.xor_descending(field.descending);
            if Self::is_boolean(field) {
                let v = match value {
                    Value::Boolean(v) => *v,
                    _ => return Err(Error::mismatching(Kind::Boolean, value.kind())),
                };
                // Bits invert per field so mixed-direction runs stay
                // well-defined; padding bits are always zero.
                if v ^ field_opts.descending {
                    bit_buffer |= 1 << bit_pos;
                }
                bit_pos += 1;
                if bit_pos == 8 {
                    n += write_all(writer, &[bit_buffer])?;
                    bit_buffer = 0;
                    bit_pos = 0;
                }
            } else {
                if bit_pos > 0 {
                    n += write_all(writer, &[bit_buffer])?;
                    bit_buffer = 0;
                    bit_pos = 0;
                }
                if !field.ty.admits(value) {
                    return Err(Error::mismatching(field.ty.kind(), value.kind())
                        .with_detail("field", &field.name));
                }
                n += encode_value(&field.ty, value, writer, field_opts)
                    .map_err(|e| e.with_detail("bytes_before_failure", n))?;
            }
        }
        if bit_pos > 0 {
            n += write_all(writer, &[bit_buffer])?;
        }
        Ok(n)
    }

    fn decode_packed(
        st: &StructType,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Vec<Value>, usize), Error> {
        let mut values = Vec::with_capacity(st.fields.len());
        let mut n = 0;
        let mut bit_buffer = 0u8;
        let mut bit_pos = 0u8;

        for field in &st.fields {
            let field_opts = opts.xor_descending(field.descending);
            if Self::is_boolean(field) {
                if bit_pos == 0 {
                    bit_buffer = reader.next()?;
                    n += 1;
                }
                let bit = (bit_buffer >> bit_pos) & 1 == 1;
                values.push(Value::Boolean(bit ^ field_opts.descending));
                bit_pos = (bit_pos + 1) % 8;
            } else {
                bit_pos = 0;
                bit_buffer = 0;
                let (value, value_n) = decode_value(&field.ty, reader, field_opts)
                    .map_err(|e| e.with_detail("bytes_before_failure", n))?;
                values.push(value);
                n += value_n;
            }
        }
        Ok((values, n))
    }

    fn skip_packed(
        st: &StructType,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let mut n = 0;
        let mut i = 0;
        while i < st.fields.len() {
            let field = &st.fields[i];
            if Self::is_boolean(field) {
                let run = st.fields[i..]
                    .iter()
                    .take_while(|f| Self::is_boolean(f))
                    .count();
                let bytes = run.div_ceil(8);
                reader.seek_ahead(bytes)?;
                n += bytes;
                i += run;
            } else {
                let field_opts = opts.xor_descending(field.descending);
                n += skip_value(&field.ty, reader, field_opts)?;
                i += 1;
            }
        }
        Ok(n)
    }

    fn encode_compat(
        st: &StructType,
        values: &[Value],
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let ordinals = Self::ordinals(st)?;
        let max_ordinal = ordinals.keys().next_back().copied().unwrap_or(0);
        let width = Self::header_width(max_ordinal);

        let mut n = write_all(writer, &[width.bytes() as u8])?;
        n += write_index(writer, max_ordinal, width, 0)?;

        // Every declared field is present and frames go out in ascending
        // ordinal order, so the max-ordinal frame terminates the struct.
        for (&ordinal, &i) in &ordinals {
            let field = &st.fields[i];
            let value = &values[i];
            let field_opts = opts.xor_descending(field.descending);
            if !field.ty.admits(value) {
                return Err(Error::mismatching(field.ty.kind(), value.kind())
                    .with_detail("field", &field.name));
            }

            let mut body = pool::acquire(64);
            {
                let mut body_writer = (&mut *body).writer();
                encode_value(&field.ty, value, &mut body_writer, field_opts)?;
            }
            n += encode_uint(writer, ordinal, 0)?;
            n += encode_uint(writer, body.len() as u64, 0)?;
            n += write_all(writer, &body)?;
        }
        Ok(n)
    }

    fn decode_compat(
        st: &StructType,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Vec<Value>, usize), Error> {
        let ordinals = Self::ordinals(st)?;

        let width_byte = reader.next()?;
        let width = IndexWidth::from_byte(width_byte)?;
        let (max_ordinal, header_n) = read_index(reader, width, 0)?;
        let mut n = 1 + header_n;

        // Missing ordinals keep their empty defaults.
        let mut values: Vec<Value> =
            st.fields.iter().map(|f| Value::empty_of(&f.ty)).collect();

        let mut pending = max_ordinal > 0;
        while pending {
            let (ordinal, ord_n) = decode_uint(reader, 0)?;
            n += ord_n;
            let (size, size_n) = decode_uint(reader, 0)?;
            n += size_n;
            let size = usize::try_from(size)
                .map_err(|_| Error::decoding("field body size overflows"))?;
            if ordinal > max_ordinal {
                return Err(Error::decoding("field ordinal beyond the header maximum")
                    .with_detail("ordinal", ordinal)
                    .with_detail("max", max_ordinal));
            }

            match ordinals.get(&ordinal) {
                Some(&i) => {
                    let field = &st.fields[i];
                    let field_opts = opts.xor_descending(field.descending);
                    let (value, value_n) = decode_value(&field.ty, reader, field_opts)
                        .map_err(|e| e.with_detail("bytes_before_failure", n))?;
                    if value_n != size {
                        return Err(Error::decoding("field body size disagrees with its frame")
                            .with_detail("framed", size)
                            .with_detail("decoded", value_n));
                    }
                    values[i] = value;
                    n += value_n;
                }
                None => {
                    tracing::trace!(ordinal, size, "skipping unknown struct field");
                    let mut left = size;
                    while left > 0 {
                        let chunk = left.min(64 * 1024);
                        reader.read_bytes(chunk)?;
                        left -= chunk;
                    }
                    n += size;
                }
            }
            pending = ordinal != max_ordinal;
        }
        Ok((values, n))
    }

    fn skip_compat(reader: &mut dyn ReadSeek) -> Result<usize, Error> {
        let width_byte = reader.next()?;
        let width = IndexWidth::from_byte(width_byte)?;
        let (max_ordinal, header_n) = read_index(reader.as_read(), width, 0)?;
        let mut n = 1 + header_n;

        let mut pending = max_ordinal > 0;
        while pending {
            let (ordinal, ord_n) = decode_uint(reader.as_read(), 0)?;
            n += ord_n;
            let (size, size_n) = decode_uint(reader.as_read(), 0)?;
            n += size_n;
            let size = usize::try_from(size)
                .map_err(|_| Error::decoding("field body size overflows"))?;
            reader.seek_ahead(size)?;
            n += size;
            pending = ordinal < max_ordinal;
        }
        Ok(n)
    }
}

impl Codec for StructCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let st = Self::descriptor(ty)?;
        let values = match value {
            Value::Struct(values) => values,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        Self::arity_check(st, values)?;
        if opts.compatibility_mode {
            Self::encode_compat(st, values, writer, opts)
        } else {
            Self::encode_packed(st, values, writer, opts)
        }
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let st = Self::descriptor(ty)?;
        let (values, n) = if opts.compatibility_mode {
            Self::decode_compat(st, reader, opts)?
        } else {
            Self::decode_packed(st, reader, opts)?
        };
        Ok((Value::Struct(values), n))
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let st = Self::descriptor(ty)?;
        if opts.compatibility_mode {
            Self::skip_compat(reader)
        } else {
            Self::skip_packed(st, reader, opts)
        }
    }
}
