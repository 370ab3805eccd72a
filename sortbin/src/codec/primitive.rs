//! Fixed-width scalar encodings
//!
//! Unsigned integers are big-endian. Signed integers store their
//! two's-complement pattern with the sign bit flipped, so unsigned byte
//! comparison reproduces signed order. Floats flip the sign bit when
//! non-negative and invert all bits when negative, mapping
//! `-inf < .. < -0 < +0 < .. < +inf` onto ascending byte order. Descending
//! inverts every output byte.

use std::io::Write;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::read::{read_const_bytes, Read, ReadSeek};
use crate::types::{IndexWidth, Type};
use crate::value::Value;

use super::Codec;

/// Write raw bytes, mapping transport failures
pub(crate) fn write_all(writer: &mut dyn Write, bytes: &[u8]) -> Result<usize, Error> {
    writer.write_all(bytes).map_err(Error::writing)?;
    Ok(bytes.len())
}

/// Write a fixed-width group of bytes under the descending mask
pub(crate) fn write_masked<const N: usize>(
    writer: &mut dyn Write,
    mut bytes: [u8; N],
    mask: u8,
) -> Result<usize, Error> {
    if mask != 0 {
        for b in &mut bytes {
            *b ^= mask;
        }
    }
    write_all(writer, &bytes)
}

/// Read a fixed-width group of bytes under the descending mask
pub(crate) fn read_masked<const N: usize>(
    reader: &mut dyn Read,
    mask: u8,
) -> Result<[u8; N], Error> {
    let mut bytes = read_const_bytes::<N>(reader)?;
    if mask != 0 {
        for b in &mut bytes {
            *b ^= mask;
        }
    }
    Ok(bytes)
}

// Sign-bit flips per width. The transform is an involution.

pub(crate) fn flip_i8(v: i8) -> u8 {
    (v as u8) ^ 0x80
}

pub(crate) fn unflip_i8(u: u8) -> i8 {
    (u ^ 0x80) as i8
}

pub(crate) fn flip_i16(v: i16) -> u16 {
    (v as u16) ^ (1 << 15)
}

pub(crate) fn unflip_i16(u: u16) -> i16 {
    (u ^ (1 << 15)) as i16
}

pub(crate) fn flip_i32(v: i32) -> u32 {
    (v as u32) ^ (1 << 31)
}

pub(crate) fn unflip_i32(u: u32) -> i32 {
    (u ^ (1 << 31)) as i32
}

pub(crate) fn flip_i64(v: i64) -> u64 {
    (v as u64) ^ (1 << 63)
}

pub(crate) fn unflip_i64(u: u64) -> i64 {
    (u ^ (1 << 63)) as i64
}

const F32_SIGN: u32 = 1 << 31;
const F64_SIGN: u64 = 1 << 63;

pub(crate) fn float32_to_ordered(v: f32) -> u32 {
    let bits = v.to_bits();
    if bits & F32_SIGN != 0 {
        !bits
    } else {
        bits | F32_SIGN
    }
}

pub(crate) fn ordered_to_float32(u: u32) -> f32 {
    if u & F32_SIGN != 0 {
        f32::from_bits(u ^ F32_SIGN)
    } else {
        f32::from_bits(!u)
    }
}

pub(crate) fn float64_to_ordered(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits & F64_SIGN != 0 {
        !bits
    } else {
        bits | F64_SIGN
    }
}

pub(crate) fn ordered_to_float64(u: u64) -> f64 {
    if u & F64_SIGN != 0 {
        f64::from_bits(u ^ F64_SIGN)
    } else {
        f64::from_bits(!u)
    }
}

/// Write an unsigned index of the given fixed width, big-endian
pub(crate) fn write_index(
    writer: &mut dyn Write,
    value: u64,
    width: IndexWidth,
    mask: u8,
) -> Result<usize, Error> {
    match width {
        IndexWidth::One => {
            if value > u8::MAX as u64 {
                return Err(Error::invalid_value("index does not fit its declared width")
                    .with_detail("index", value));
            }
            write_masked(writer, (value as u8).to_be_bytes(), mask)
        }
        IndexWidth::Two => {
            if value > u16::MAX as u64 {
                return Err(Error::invalid_value("index does not fit its declared width")
                    .with_detail("index", value));
            }
            write_masked(writer, (value as u16).to_be_bytes(), mask)
        }
        IndexWidth::Four => {
            if value > u32::MAX as u64 {
                return Err(Error::invalid_value("index does not fit its declared width")
                    .with_detail("index", value));
            }
            write_masked(writer, (value as u32).to_be_bytes(), mask)
        }
        IndexWidth::Eight => write_masked(writer, value.to_be_bytes(), mask),
    }
}

/// Read an unsigned index of the given fixed width, big-endian
pub(crate) fn read_index(
    reader: &mut dyn Read,
    width: IndexWidth,
    mask: u8,
) -> Result<(u64, usize), Error> {
    let value = match width {
        IndexWidth::One => u8::from_be_bytes(read_masked::<1>(reader, mask)?) as u64,
        IndexWidth::Two => u16::from_be_bytes(read_masked::<2>(reader, mask)?) as u64,
        IndexWidth::Four => u32::from_be_bytes(read_masked::<4>(reader, mask)?) as u64,
        IndexWidth::Eight => u64::from_be_bytes(read_masked::<8>(reader, mask)?),
    };
    Ok((value, width.bytes()))
}

/// One-byte true/false
pub(crate) struct BooleanCodec;

impl Codec for BooleanCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let v = match value {
            Value::Boolean(v) => *v,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        write_masked(writer, [v as u8], opts.mask())
    }

    fn decode(
        &self,
        _ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let [byte] = read_masked::<1>(reader, opts.mask())?;
        let v = match byte {
            0x00 => false,
            0x01 => true,
            _ => return Err(Error::decoding("invalid boolean byte").with_detail("byte", byte)),
        };
        Ok((Value::Boolean(v), 1))
    }

    fn skip(
        &self,
        _ty: &Type,
        reader: &mut dyn ReadSeek,
        _opts: ValueOptions,
    ) -> Result<usize, Error> {
        reader.seek_ahead(1)?;
        Ok(1)
    }
}

/// Fixed-width unsigned integers, big-endian
pub(crate) struct UnsignedCodec;

impl Codec for UnsignedCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let m = opts.mask();
        match (ty, value) {
            (Type::Uint8, Value::Uint8(v)) => write_masked(writer, v.to_be_bytes(), m),
            (Type::Uint16, Value::Uint16(v)) => write_masked(writer, v.to_be_bytes(), m),
            (Type::Uint32, Value::Uint32(v)) => write_masked(writer, v.to_be_bytes(), m),
            (Type::Uint64, Value::Uint64(v)) => write_masked(writer, v.to_be_bytes(), m),
            _ => Err(Error::mismatching(ty.kind(), value.kind())),
        }
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let m = opts.mask();
        match ty {
            Type::Uint8 => Ok((Value::Uint8(u8::from_be_bytes(read_masked::<1>(reader, m)?)), 1)),
            Type::Uint16 => Ok((
                Value::Uint16(u16::from_be_bytes(read_masked::<2>(reader, m)?)),
                2,
            )),
            Type::Uint32 => Ok((
                Value::Uint32(u32::from_be_bytes(read_masked::<4>(reader, m)?)),
                4,
            )),
            Type::Uint64 => Ok((
                Value::Uint64(u64::from_be_bytes(read_masked::<8>(reader, m)?)),
                8,
            )),
            _ => Err(Error::invalid_type("unsigned codec invoked with a non-unsigned descriptor")),
        }
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let width = ty
            .fixed_encoded_width(opts)
            .ok_or_else(|| Error::invalid_type("unsigned codec invoked with a non-unsigned descriptor"))?;
        reader.seek_ahead(width)?;
        Ok(width)
    }
}

/// Fixed-width signed integers, sign bit flipped
pub(crate) struct SignedCodec;

impl Codec for SignedCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let m = opts.mask();
        match (ty, value) {
            (Type::Int8, Value::Int8(v)) => write_masked(writer, flip_i8(*v).to_be_bytes(), m),
            (Type::Int16, Value::Int16(v)) => write_masked(writer, flip_i16(*v).to_be_bytes(), m),
            (Type::Int32, Value::Int32(v)) => write_masked(writer, flip_i32(*v).to_be_bytes(), m),
            (Type::Int64, Value::Int64(v)) => write_masked(writer, flip_i64(*v).to_be_bytes(), m),
            _ => Err(Error::mismatching(ty.kind(), value.kind())),
        }
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let m = opts.mask();
        match ty {
            Type::Int8 => Ok((
                Value::Int8(unflip_i8(u8::from_be_bytes(read_masked::<1>(reader, m)?))),
                1,
            )),
            Type::Int16 => Ok((
                Value::Int16(unflip_i16(u16::from_be_bytes(read_masked::<2>(reader, m)?))),
                2,
            )),
            Type::Int32 => Ok((
                Value::Int32(unflip_i32(u32::from_be_bytes(read_masked::<4>(reader, m)?))),
                4,
            )),
            Type::Int64 => Ok((
                Value::Int64(unflip_i64(u64::from_be_bytes(read_masked::<8>(reader, m)?))),
                8,
            )),
            _ => Err(Error::invalid_type("signed codec invoked with a non-signed descriptor")),
        }
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let width = ty
            .fixed_encoded_width(opts)
            .ok_or_else(|| Error::invalid_type("signed codec invoked with a non-signed descriptor"))?;
        reader.seek_ahead(width)?;
        Ok(width)
    }
}

/// IEEE 754 floats in order-preserving form.
///
/// NaN round-trips bit-exactly; its position relative to finite values is
/// unspecified.
pub(crate) struct FloatCodec;

impl Codec for FloatCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let m = opts.mask();
        match (ty, value) {
            (Type::Float32, Value::Float32(v)) => {
                write_masked(writer, float32_to_ordered(v.into_inner()).to_be_bytes(), m)
            }
            (Type::Float64, Value::Float64(v)) => {
                write_masked(writer, float64_to_ordered(v.into_inner()).to_be_bytes(), m)
            }
            _ => Err(Error::mismatching(ty.kind(), value.kind())),
        }
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let m = opts.mask();
        match ty {
            Type::Float32 => {
                let u = u32::from_be_bytes(read_masked::<4>(reader, m)?);
                Ok((Value::Float32(ordered_to_float32(u).into()), 4))
            }
            Type::Float64 => {
                let u = u64::from_be_bytes(read_masked::<8>(reader, m)?);
                Ok((Value::Float64(ordered_to_float64(u).into()), 8))
            }
            _ => Err(Error::invalid_type("float codec invoked with a non-float descriptor")),
        }
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let width = ty
            .fixed_encoded_width(opts)
            .ok_or_else(|| Error::invalid_type("float codec invoked with a non-float descriptor"))?;
        reader.seek_ahead(width)?;
        Ok(width)
    }
}
