//! Any encoding
//!
//! `Any` is the only self-describing kind: the value's own descriptor is
//! written before its body, so the consumer needs no out-of-band type. The
//! descriptor uses its canonical wire form; the body honors the call's
//! options.

use std::io::Write;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::Type;
use crate::value::Value;

use super::{decode_value, encode_value, skip_value, Codec};

/// Any codec
pub(crate) struct AnyCodec;

impl Codec for AnyCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let (inner_ty, child) = match value {
            Value::Any { ty: inner, value } => (inner.as_ref(), value.as_ref()),
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        let mut n = inner_ty.encode(writer)?;
        n += encode_value(inner_ty, child, writer, opts)?;
        Ok(n)
    }

    fn decode(
        &self,
        _ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let (inner_ty, mut n) = Type::decode(reader)?;
        let (child, child_n) = decode_value(&inner_ty, reader, opts)?;
        n += child_n;
        Ok((
            Value::Any {
                ty: Box::new(inner_ty),
                value: Box::new(child),
            },
            n,
        ))
    }

    fn skip(
        &self,
        _ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let (inner_ty, mut n) = Type::decode(reader.as_read())?;
        n += skip_value(&inner_ty, reader, opts)?;
        Ok(n)
    }
}
