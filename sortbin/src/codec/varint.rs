//! Variable-length integer encodings
//!
//! A `Uint` is a width prefix (`0x00` for the value zero, `0x01..0x08` for
//! the payload length) followed by a minimum-length big-endian payload.
//! Shorter payloads sort first and equal-width payloads compare
//! big-endian, so the form is order-preserving as is.
//!
//! An `Int` has two forms: a sign byte followed by the magnitude as a
//! `Uint` (compact, not order-preserving across negatives), and a
//! comparable form using the full eight-byte sign-flipped transform.

use std::io::Write;

use crate::error::Error;
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::Type;
use crate::value::Value;

use super::primitive::{flip_i64, read_masked, unflip_i64, write_all, write_masked};
use super::Codec;

/// Largest admissible width prefix
const MAX_PAYLOAD_WIDTH: u8 = 8;

/// Encode a variable-length unsigned integer under the given mask
pub(crate) fn encode_uint(writer: &mut dyn Write, value: u64, mask: u8) -> Result<usize, Error> {
    if value == 0 {
        return write_all(writer, &[mask]);
    }
    let width = (64 - value.leading_zeros() as usize + 7) / 8;
    let be = value.to_be_bytes();
    let mut out = [0u8; 9];
    out[0] = width as u8 ^ mask;
    for i in 0..width {
        out[1 + i] = be[8 - width + i] ^ mask;
    }
    write_all(writer, &out[..1 + width])
}

/// Decode a variable-length unsigned integer under the given mask
pub(crate) fn decode_uint(reader: &mut dyn Read, mask: u8) -> Result<(u64, usize), Error> {
    let prefix = reader.next()? ^ mask;
    if prefix == 0 {
        return Ok((0, 1));
    }
    if prefix > MAX_PAYLOAD_WIDTH {
        return Err(Error::decoding("invalid unsigned width prefix").with_detail("prefix", prefix));
    }
    let width = prefix as usize;
    let mut be = [0u8; 8];
    reader.read_exact(&mut be[8 - width..])?;
    if mask != 0 {
        for b in &mut be[8 - width..] {
            *b ^= mask;
        }
    }
    if be[8 - width] == 0 {
        return Err(Error::decoding("unsigned payload has a leading zero byte"));
    }
    Ok((u64::from_be_bytes(be), 1 + width))
}

/// Advance past a variable-length unsigned integer
pub(crate) fn skip_uint(reader: &mut dyn ReadSeek, mask: u8) -> Result<usize, Error> {
    let prefix = reader.next()? ^ mask;
    if prefix == 0 {
        return Ok(1);
    }
    if prefix > MAX_PAYLOAD_WIDTH {
        return Err(Error::decoding("invalid unsigned width prefix").with_detail("prefix", prefix));
    }
    reader.seek_ahead(prefix as usize)?;
    Ok(1 + prefix as usize)
}

/// Variable-length unsigned integer codec
pub(crate) struct VarUintCodec;

impl Codec for VarUintCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let v = match value {
            Value::Uint(v) => *v,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        encode_uint(writer, v, opts.mask())
    }

    fn decode(
        &self,
        _ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let (v, n) = decode_uint(reader, opts.mask())?;
        Ok((Value::Uint(v), n))
    }

    fn skip(
        &self,
        _ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        skip_uint(reader, opts.mask())
    }
}

/// Variable-length signed integer codec
pub(crate) struct VarIntCodec;

impl Codec for VarIntCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let v = match value {
            Value::Int(v) => *v,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        let m = opts.mask();
        if opts.comparable {
            return write_masked(writer, flip_i64(v).to_be_bytes(), m);
        }
        let sign: u8 = if v >= 0 { 0x01 } else { 0x00 };
        let mut n = write_all(writer, &[sign ^ m])?;
        n += encode_uint(writer, v.unsigned_abs(), m)?;
        Ok(n)
    }

    fn decode(
        &self,
        _ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let m = opts.mask();
        if opts.comparable {
            let u = u64::from_be_bytes(read_masked::<8>(reader, m)?);
            return Ok((Value::Int(unflip_i64(u)), 8));
        }
        let sign = reader.next()? ^ m;
        let (magnitude, n) = decode_uint(reader, m)?;
        let v = match sign {
            0x01 => {
                if magnitude > i64::MAX as u64 {
                    return Err(Error::decoding("signed magnitude overflows")
                        .with_detail("magnitude", magnitude));
                }
                magnitude as i64
            }
            0x00 => {
                if magnitude > (i64::MAX as u64) + 1 {
                    return Err(Error::decoding("signed magnitude overflows")
                        .with_detail("magnitude", magnitude));
                }
                magnitude.wrapping_neg() as i64
            }
            _ => return Err(Error::decoding("invalid sign byte").with_detail("byte", sign)),
        };
        Ok((Value::Int(v), 1 + n))
    }

    fn skip(
        &self,
        _ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        if opts.comparable {
            reader.seek_ahead(8)?;
            return Ok(8);
        }
        reader.seek_ahead(1)?;
        Ok(1 + skip_uint(reader, opts.mask())?)
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
    fn test_encode_uint() {
        assert_eq!(
            roundtrip(&Type::Uint, Value::Uint(0), ValueOptions::new()),
            vec![0x00]
        );
        assert_eq!(
            roundtrip(&Type::Uint, Value::Uint(1), ValueOptions::new()),
            vec![0x01, 0x01]
        );
        assert_eq!(
            roundtrip(&Type::Uint, Value::Uint(0xff), ValueOptions::new()),
            vec![0x01, 0xff]
        );
        assert_eq!(
            roundtrip(&Type::Uint, Value::Uint(0x100), ValueOptions::new()),
            vec![0x02, 0x01, 0x00]
        );
        assert_eq!(
            roundtrip(&Type::Uint, Value::Uint(u64::MAX), ValueOptions::new()),
            vec![0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_encode_uint_descending() {
        let opts = ValueOptions::new().with_descending(true);
        assert_eq!(roundtrip(&Type::Uint, Value::Uint(0), opts), vec![0xff]);
        assert_eq!(
            roundtrip(&Type::Uint, Value::Uint(0xff), opts),
            vec![0xfe, 0x00]
        );
    }

    #[test]
    fn test_uint_is_order_preserving() {
        let values = [0u64, 1, 2, 0xfe, 0xff, 0x100, 0xffff, 0x10000, u64::MAX];
        let encoded: Vec<Vec<u8>> = values
            .iter()
            .map(|v| {
                let mut out = Vec::new();
                encode_value(&Type::Uint, &Value::Uint(*v), &mut out, ValueOptions::new()).unwrap();
                out
            })
            .collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(sorted, encoded);
    }

    #[test]
    fn test_non_minimal_uint_is_rejected() {
        let mut reader = SliceReader::new(&[0x02, 0x00, 0xff]);
        assert!(decode_value(&Type::Uint, &mut reader, ValueOptions::new()).is_err());
    }

    #[test]
    fn test_encode_int() {
        assert_eq!(
            roundtrip(&Type::Int, Value::Int(0), ValueOptions::new()),
            vec![0x01, 0x00]
        );
        assert_eq!(
            roundtrip(&Type::Int, Value::Int(5), ValueOptions::new()),
            vec![0x01, 0x01, 0x05]
        );
        assert_eq!(
            roundtrip(&Type::Int, Value::Int(-5), ValueOptions::new()),
            vec![0x00, 0x01, 0x05]
        );
        roundtrip(&Type::Int, Value::Int(i64::MIN), ValueOptions::new());
        roundtrip(&Type::Int, Value::Int(i64::MAX), ValueOptions::new());
    }

    #[test]
    fn test_encode_int_comparable() {
        let opts = ValueOptions::new().with_comparable(true);
        assert_eq!(
            roundtrip(&Type::Int, Value::Int(0), opts),
            vec![0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            roundtrip(&Type::Int, Value::Int(-1), opts),
            vec![0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );

        let values = [i64::MIN, -70000, -1, 0, 1, 70000, i64::MAX];
        let encoded: Vec<Vec<u8>> = values
            .iter()
            .map(|v| {
                let mut out = Vec::new();
                encode_value(&Type::Int, &Value::Int(*v), &mut out, opts).unwrap();
                out
            })
            .collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(sorted, encoded);
    }

    #[test]
    fn test_int_descending_roundtrip() {
        let opts = ValueOptions::new().with_descending(true);
        for v in [i64::MIN, -12345, -1, 0, 1, 12345, i64::MAX] {
            roundtrip(&Type::Int, Value::Int(v), opts);
        }
    }
}
