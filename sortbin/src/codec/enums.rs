//! Enum encoding
//!
//! An enum constant is its unsigned value written big-endian at the
//! declared index width. Both directions verify the constant is declared.

use std::io::Write;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::{EnumType, Type};
use crate::value::Value;

use super::primitive::{read_index, write_index};
use super::Codec;

/// Enum codec
pub(crate) struct EnumCodec;

impl EnumCodec {
    fn descriptor(ty: &Type) -> Result<&EnumType, Error> {
        match ty {
            Type::Enum(en) => Ok(en),
            _ => Err(Error::invalid_type("enum codec invoked with a non-enum descriptor")),
        }
    }

    fn verify_declared(en: &EnumType, value: u64) -> Result<(), Error> {
        if en.elements.iter().any(|e| e.value == value) {
            Ok(())
        } else {
            Err(Error::constraint("enum constant is not declared").with_detail("value", value))
        }
    }
}

impl Codec for EnumCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let en = Self::descriptor(ty)?;
        let v = match value {
            Value::Enum(v) => *v,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        Self::verify_declared(en, v)?;
        write_index(writer, v, en.index_bytes, opts.mask())
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let en = Self::descriptor(ty)?;
        let (v, n) = read_index(reader, en.index_bytes, opts.mask())?;
        Self::verify_declared(en, v)?;
        Ok((Value::Enum(v), n))
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        _opts: ValueOptions,
    ) -> Result<usize, Error> {
        let en = Self::descriptor(ty)?;
        let width = en.index_bytes.bytes();
        reader.seek_ahead(width)?;
        Ok(width)
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode_value, encode_value, skip_value};
    use crate::options::ValueOptions;
    use crate::read::SliceReader;
    use crate::types::{EnumElement, EnumType, IndexWidth, Type};
    use crate::value::Value;

    fn color() -> Type {
        Type::Enum(EnumType::new(
            IndexWidth::Two,
            vec![
                EnumElement::new("red", 1),
                EnumElement::new("green", 2),
                EnumElement::new("blue", 500),
            ],
        ))
    }

    #[test]
    fn test_encode_enum() {
        let ty = color();
        let mut out = Vec::new();
        let n = encode_value(&ty, &Value::Enum(500), &mut out, ValueOptions::new()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, vec![0x01, 0xf4]);

        let mut reader = SliceReader::new(&out);
        let (decoded, read) = decode_value(&ty, &mut reader, ValueOptions::new()).unwrap();
        assert_eq!(read, 2);
        assert_eq!(decoded, Value::Enum(500));

        let mut reader = SliceReader::new(&out);
        assert_eq!(skip_value(&ty, &mut reader, ValueOptions::new()).unwrap(), 2);
    }

    #[test]
    fn test_enum_descending() {
        let ty = color();
        let opts = ValueOptions::new().with_descending(true);
        let mut out = Vec::new();
        encode_value(&ty, &Value::Enum(1), &mut out, opts).unwrap();
        assert_eq!(out, vec![0xff, 0xfe]);

        let mut reader = SliceReader::new(&out);
        let (decoded, _) = decode_value(&ty, &mut reader, opts).unwrap();
        assert_eq!(decoded, Value::Enum(1));
    }

    #[test]
    fn test_undeclared_constant() {
        let ty = color();
        let mut out = Vec::new();
        let err = encode_value(&ty, &Value::Enum(3), &mut out, ValueOptions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeConstraintViolation);

        let mut reader = SliceReader::new(&[0x00, 0x03]);
        let err = decode_value(&ty, &mut reader, ValueOptions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeConstraintViolation);
    }
}
