//! Nullable encoding
//!
//! One flag byte (`0x01` non-null, `0x00` null, inverted under descending)
//! followed by the inner value in full when non-null. Null therefore sorts
//! strictly before any non-null encoding ascending, and after it
//! descending.

use std::io::Write;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::Type;
use crate::value::Value;

use super::primitive::write_all;
use super::{decode_value, encode_value, skip_value, Codec};

/// Nullable codec
pub(crate) struct NullableCodec;

impl NullableCodec {
    fn inner(ty: &Type) -> Result<&Type, Error> {
        match ty {
            Type::Nullable(inner) => Ok(inner),
            _ => Err(Error::invalid_type("nullable codec invoked with a non-nullable descriptor")),
        }
    }
}

impl Codec for NullableCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let inner_ty = Self::inner(ty)?;
        let child = match value {
            Value::Nullable(child) => child,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        let m = opts.mask();
        match child {
            None => write_all(writer, &[m]),
            Some(inner) => {
                let mut n = write_all(writer, &[0x01 ^ m])?;
                n += encode_value(inner_ty, inner, writer, opts)?;
                Ok(n)
            }
        }
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let inner_ty = Self::inner(ty)?;
        let flag = reader.next()? ^ opts.mask();
        match flag {
            0x00 => Ok((Value::Nullable(None), 1)),
            0x01 => {
                let (inner, n) = decode_value(inner_ty, reader, opts)?;
                Ok((Value::Nullable(Some(Box::new(inner))), 1 + n))
            }
            _ => Err(Error::decoding("invalid nullable flag byte").with_detail("byte", flag)),
        }
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let inner_ty = Self::inner(ty)?;
        // The flag is one byte of skip under all options; descending only
        // affects its interpretation.
        let flag = reader.next()? ^ opts.mask();
        match flag {
            0x00 => Ok(1),
            0x01 => Ok(1 + skip_value(inner_ty, reader, opts)?),
            _ => Err(Error::decoding("invalid nullable flag byte").with_detail("byte", flag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode_value, encode_value, skip_value};
    use crate::options::ValueOptions;
    use crate::read::SliceReader;
    use crate::types::Type;
    use crate::value::Value;

    fn roundtrip(ty: &Type, value: Value, opts: ValueOptions) -> Vec<u8> {
        let mut out = Vec::new();
        let written = encode_value(ty, &value, &mut out, opts).unwrap();
        assert_eq!(written, out.len());

        let mut reader = SliceReader::new(&out);
        let (decoded, read) = decode_value(ty, &mut reader, opts).unwrap();
        assert_eq!(read, out.len());
        assert_eq!(decoded, value);

        let mut reader = SliceReader::new(&out);
        assert_eq!(skip_value(ty, &mut reader, opts).unwrap(), out.len());

        out
    }

    #[test]
    fn test_encode_null() {
        let ty = Type::nullable(Type::String);
        let bytes = roundtrip(&ty, Value::Nullable(None), ValueOptions::new());
        assert_eq!(bytes, vec![0x00]);
    }

    #[test]
    fn test_encode_non_null() {
        let ty = Type::nullable(Type::String);
        let bytes = roundtrip(
            &ty,
            Value::Nullable(Some(Box::new(Value::String("test value".into())))),
            ValueOptions::new(),
        );
        let mut expected = vec![0x01, 0x01, 0x0a];
        expected.extend_from_slice(b"test value");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_null_sorts_first() {
        let ty = Type::nullable(Type::Uint8);
        let mut null = Vec::new();
        encode_value(&ty, &Value::Nullable(None), &mut null, ValueOptions::new()).unwrap();
        let mut some = Vec::new();
        encode_value(
            &ty,
            &Value::Nullable(Some(Box::new(Value::Uint8(0)))),
            &mut some,
            ValueOptions::new(),
        )
        .unwrap();
        assert!(null < some);

        // and after it under descending
        let desc = ValueOptions::new().with_descending(true);
        let mut null_d = Vec::new();
        encode_value(&ty, &Value::Nullable(None), &mut null_d, desc).unwrap();
        let mut some_d = Vec::new();
        encode_value(
            &ty,
            &Value::Nullable(Some(Box::new(Value::Uint8(0)))),
            &mut some_d,
            desc,
        )
        .unwrap();
        assert!(null_d > some_d);
    }

    #[test]
    fn test_descending_roundtrip() {
        let ty = Type::nullable(Type::Int32);
        let opts = ValueOptions::new().with_descending(true);
        roundtrip(&ty, Value::Nullable(None), opts);
        roundtrip(&ty, Value::Nullable(Some(Box::new(Value::Int32(-7)))), opts);
    }

    #[test]
    fn test_nested_nullable() {
        let ty = Type::nullable(Type::nullable(Type::Boolean));
        let value = Value::Nullable(Some(Box::new(Value::Nullable(Some(Box::new(
            Value::Boolean(true),
        ))))));
        roundtrip(&ty, value, ValueOptions::new());
        roundtrip(
            &ty,
            Value::Nullable(Some(Box::new(Value::Nullable(None)))),
            ValueOptions::new(),
        );
    }
}
