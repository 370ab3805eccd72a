//! The codec engine
//!
//! One module per encoding family, tied together by a kind-indexed dispatch
//! table. The table holds one [`Codec`] object per [`Kind`]; composite
//! codecs re-enter it through [`codec_of`] at call time, so recursive types
//! resolve without initialization cycles.

use std::io::Write;

use crate::error::Error;
use crate::kind::{Kind, KIND_COUNT};
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::Type;
use crate::value::Value;

pub(crate) mod any;
pub(crate) mod array;
pub(crate) mod enums;
pub(crate) mod map;
pub(crate) mod nullable;
pub(crate) mod oneof;
pub(crate) mod primitive;
pub(crate) mod structs;
pub(crate) mod temporal;
pub(crate) mod text;
pub(crate) mod varint;

/// Upper bound on speculative preallocation from decoded counts.
///
/// A malformed stream may carry an absurd length prefix; collections grow
/// past this point by pushing, not by trusting the prefix.
pub(crate) const MAX_PREALLOC: usize = 4096;

/// Encode, decode, and skip for one kind.
///
/// `ty` is always a descriptor of the kind the object is registered under;
/// every method returns the number of bytes produced or consumed.
pub(crate) trait Codec: Sync {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error>;

    fn decode(&self, ty: &Type, reader: &mut dyn Read, opts: ValueOptions)
        -> Result<(Value, usize), Error>;

    fn skip(&self, ty: &Type, reader: &mut dyn ReadSeek, opts: ValueOptions)
        -> Result<usize, Error>;
}

/// The `Undefined` kind rejects every operation.
struct UndefinedCodec;

impl Codec for UndefinedCodec {
    fn encode(
        &self,
        _ty: &Type,
        _value: &Value,
        _writer: &mut dyn Write,
        _opts: ValueOptions,
    ) -> Result<usize, Error> {
        Err(Error::undefined("encode"))
    }

    fn decode(
        &self,
        _ty: &Type,
        _reader: &mut dyn Read,
        _opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        Err(Error::undefined("decode"))
    }

    fn skip(
        &self,
        _ty: &Type,
        _reader: &mut dyn ReadSeek,
        _opts: ValueOptions,
    ) -> Result<usize, Error> {
        Err(Error::undefined("skip"))
    }
}

/// `Named` is a labeling indirection: all three operations forward to the
/// inner type's codec.
struct NamedCodec;

impl NamedCodec {
    fn inner(ty: &Type) -> Result<&Type, Error> {
        match ty {
            Type::Named(named) => Ok(&named.inner),
            _ => Err(Error::invalid_type("named codec invoked with a non-named descriptor")),
        }
    }
}

impl Codec for NamedCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let inner = Self::inner(ty)?;
        encode_value(inner, value, writer, opts)
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let inner = Self::inner(ty)?;
        decode_value(inner, reader, opts)
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let inner = Self::inner(ty)?;
        skip_value(inner, reader, opts)
    }
}

/// One slot per kind, in discriminant order.
static CODECS: [&'static dyn Codec; KIND_COUNT] = [
    &UndefinedCodec,          // Undefined
    &primitive::BooleanCodec, // Boolean
    &varint::VarIntCodec,     // Int
    &primitive::SignedCodec,  // Int8
    &primitive::SignedCodec,  // Int16
    &primitive::SignedCodec,  // Int32
    &primitive::SignedCodec,  // Int64
    &varint::VarUintCodec,    // Uint
    &primitive::UnsignedCodec, // Uint8
    &primitive::UnsignedCodec, // Uint16
    &primitive::UnsignedCodec, // Uint32
    &primitive::UnsignedCodec, // Uint64
    &primitive::FloatCodec,   // Float32
    &primitive::FloatCodec,   // Float64
    &text::TextCodec,         // String
    &text::TextCodec,         // Bytes
    &temporal::TemporalCodec, // Duration
    &temporal::TemporalCodec, // Timestamp
    &temporal::DateTimeCodec, // DateTime
    &enums::EnumCodec,        // Enum
    &array::ArrayCodec,       // Array
    &map::MapCodec,           // Map
    &structs::StructCodec,    // Struct
    &nullable::NullableCodec, // Nullable
    &oneof::OneOfCodec,       // OneOf
    &NamedCodec,              // Named
    &any::AnyCodec,           // Any
];

/// The codec registered for `kind`
pub(crate) fn codec_of(kind: Kind) -> &'static dyn Codec {
    CODECS[kind as usize]
}

/// Encode `value` as `ty` onto `writer`; returns bytes written
pub(crate) fn encode_value(
    ty: &Type,
    value: &Value,
    writer: &mut dyn Write,
    opts: ValueOptions,
) -> Result<usize, Error> {
    codec_of(ty.kind()).encode(ty, value, writer, opts)
}

/// Decode one `ty` value off `reader`; returns the value and bytes read
pub(crate) fn decode_value(
    ty: &Type,
    reader: &mut dyn Read,
    opts: ValueOptions,
) -> Result<(Value, usize), Error> {
    codec_of(ty.kind()).decode(ty, reader, opts)
}

/// Advance `reader` past one `ty` value; returns bytes skipped
pub(crate) fn skip_value(
    ty: &Type,
    reader: &mut dyn ReadSeek,
    opts: ValueOptions,
) -> Result<usize, Error> {
    codec_of(ty.kind()).skip(ty, reader, opts)
}

#[cfg(test)]
mod tests {
    use super::codec_of;
    use crate::error::ErrorKind;
    use crate::kind::Kind;
    use crate::options::ValueOptions;
    use crate::read::SliceReader;
    use crate::types::Type;
    use crate::value::Value;

    #[test]
    fn test_undefined_rejects_all_operations() {
        let codec = codec_of(Kind::Undefined);
        let opts = ValueOptions::new();

        let mut out = Vec::new();
        let err = codec
            .encode(&Type::Undefined, &Value::Undefined, &mut out, opts)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedType);

        let mut reader = SliceReader::new(&[0x00]);
        let err = codec.decode(&Type::Undefined, &mut reader, opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedType);

        let mut reader = SliceReader::new(&[0x00]);
        let err = codec.skip(&Type::Undefined, &mut reader, opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedType);
    }

    #[test]
    fn test_named_forwards_to_inner() {
        let ty = Type::named("age", Type::Uint8);
        let value = Value::Uint8(42);
        let opts = ValueOptions::new();

        let mut out = Vec::new();
        let n = super::encode_value(&ty, &value, &mut out, opts).unwrap();
        assert_eq!(n, 1);
        assert_eq!(out, vec![42]);

        let mut reader = SliceReader::new(&out);
        let (decoded, n) = super::decode_value(&ty, &mut reader, opts).unwrap();
        assert_eq!(n, 1);
        assert_eq!(decoded, value);
    }
}
