//! OneOf encoding
//!
//! A big-endian variant index at the declared width, followed by the
//! selected variant's value. Unknown indices are a constraint violation in
//! both directions.

use std::io::Write;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::{OneOfType, Type};
use crate::value::Value;

use super::primitive::{read_index, write_index};
use super::{decode_value, encode_value, skip_value, Codec};

/// OneOf codec
pub(crate) struct OneOfCodec;

impl OneOfCodec {
    fn descriptor(ty: &Type) -> Result<&OneOfType, Error> {
        match ty {
            Type::OneOf(oneof) => Ok(oneof),
            _ => Err(Error::invalid_type("oneof codec invoked with a non-oneof descriptor")),
        }
    }

    fn element(oneof: &OneOfType, index: u64) -> Result<&Type, Error> {
        usize::try_from(index)
            .ok()
            .and_then(|i| oneof.elements.get(i))
            .ok_or_else(|| {
                Error::constraint("oneof index is not declared")
                    .with_detail("index", index)
                    .with_detail("declared", oneof.elements.len())
            })
    }
}

impl Codec for OneOfCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let oneof = Self::descriptor(ty)?;
        let (index, child) = match value {
            Value::OneOf { index, value } => (*index, value.as_ref()),
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        let elem_ty = Self::element(oneof, index)?;
        if !elem_ty.admits(child) {
            return Err(Error::mismatching(elem_ty.kind(), child.kind()).with_detail("index", index));
        }
        let mut n = write_index(writer, index, oneof.index_bytes, opts.mask())?;
        n += encode_value(elem_ty, child, writer, opts)?;
        Ok(n)
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let oneof = Self::descriptor(ty)?;
        let (index, mut n) = read_index(reader, oneof.index_bytes, opts.mask())?;
        let elem_ty = Self::element(oneof, index)?;
        let (child, child_n) = decode_value(elem_ty, reader, opts)?;
        n += child_n;
        Ok((
            Value::OneOf {
                index,
                value: Box::new(child),
            },
            n,
        ))
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let oneof = Self::descriptor(ty)?;
        let (index, mut n) = read_index(reader.as_read(), oneof.index_bytes, opts.mask())?;
        let elem_ty = Self::element(oneof, index)?;
        n += skip_value(elem_ty, reader, opts)?;
        Ok(n)
    }
}
