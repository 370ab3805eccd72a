//! Temporal encodings
//!
//! Timestamps and durations are signed 64-bit nanosecond counts in the
//! order-preserving form. A datetime is its timestamp optionally followed
//! by the zone identity; a fixed-zone descriptor keeps the zone off the
//! wire entirely.

use std::io::Write;

use crate::error::{Error, ErrorKind};
use crate::options::ValueOptions;
use crate::primitives::{DateTime, Timestamp};
use crate::read::{Read, ReadSeek};
use crate::types::Type;
use crate::value::Value;

use super::primitive::{flip_i64, read_masked, unflip_i64, write_masked};
use super::text;
use super::Codec;

/// Timestamp and Duration codec
pub(crate) struct TemporalCodec;

impl Codec for TemporalCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let nanos = match (ty, value) {
            (Type::Timestamp, Value::Timestamp(ts)) => ts.nanoseconds(),
            (Type::Duration, Value::Duration(d)) => d.nanoseconds(),
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        write_masked(writer, flip_i64(nanos).to_be_bytes(), opts.mask())
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let u = u64::from_be_bytes(read_masked::<8>(reader, opts.mask())?);
        let nanos = unflip_i64(u);
        let value = match ty {
            Type::Timestamp => Value::Timestamp(Timestamp::from_nanoseconds(nanos)),
            Type::Duration => Value::Duration(crate::primitives::Duration::from_nanoseconds(nanos)),
            _ => {
                return Err(Error::invalid_type(
                    "temporal codec invoked with a non-temporal descriptor",
                ))
            }
        };
        Ok((value, 8))
    }

    fn skip(
        &self,
        _ty: &Type,
        reader: &mut dyn ReadSeek,
        _opts: ValueOptions,
    ) -> Result<usize, Error> {
        reader.seek_ahead(8)?;
        Ok(8)
    }
}

/// DateTime codec
pub(crate) struct DateTimeCodec;

impl DateTimeCodec {
    fn fixed_zone(ty: &Type) -> Result<&Option<String>, Error> {
        match ty {
            Type::DateTime { fixed_zone } => Ok(fixed_zone),
            _ => Err(Error::invalid_type("datetime codec invoked with a non-datetime descriptor")),
        }
    }
}

impl Codec for DateTimeCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let dt = match value {
            Value::DateTime(dt) => dt,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        let m = opts.mask();
        let mut n = write_masked(writer, flip_i64(dt.timestamp.nanoseconds()).to_be_bytes(), m)?;

        match Self::fixed_zone(ty)? {
            Some(zone) => {
                if dt.zone != *zone {
                    return Err(Error::new(
                        ErrorKind::MismatchingValueType,
                        "datetime zone disagrees with the fixed-zone type",
                    )
                    .with_detail("declared", zone)
                    .with_detail("found", &dt.zone));
                }
            }
            None => {
                if opts.comparable {
                    n += text::encode_escaped(writer, dt.zone.bytes().map(|b| b ^ m), m)?;
                } else {
                    n += text::encode_len_prefixed(writer, dt.zone.as_bytes(), m)?;
                }
            }
        }
        Ok(n)
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let m = opts.mask();
        let u = u64::from_be_bytes(read_masked::<8>(reader, m)?);
        let timestamp = Timestamp::from_nanoseconds(unflip_i64(u));
        let mut n = 8;

        let zone = match Self::fixed_zone(ty)? {
            Some(zone) => zone.clone(),
            None => {
                let (mut payload, zone_n) = if opts.comparable {
                    text::decode_escaped(reader, m)?
                } else {
                    text::decode_len_prefixed(reader, m)?
                };
                if opts.comparable && m != 0 {
                    for b in &mut payload {
                        *b ^= m;
                    }
                }
                n += zone_n;
                String::from_utf8(payload)
                    .map_err(|_| Error::decoding("zone identity is not valid UTF-8"))?
            }
        };
        Ok((Value::DateTime(DateTime::new(timestamp, zone)), n))
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        reader.seek_ahead(8)?;
        let mut n = 8;
        if Self::fixed_zone(ty)?.is_none() {
            if opts.comparable {
                n += text::skip_escaped(reader, opts.mask())?;
            } else {
                n += text::skip_len_prefixed(reader, opts.mask())?;
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode_value, encode_value, skip_value};
    use crate::options::ValueOptions;
    use crate::primitives::{DateTime, Duration, Timestamp};
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
    fn test_encode_timestamp() {
        let bytes = roundtrip(
            &Type::Timestamp,
            Value::Timestamp(Timestamp::from_nanoseconds(0)),
            ValueOptions::new(),
        );
        assert_eq!(bytes, vec![0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        roundtrip(
            &Type::Timestamp,
            Value::Timestamp(Timestamp::from_nanoseconds(-1)),
            ValueOptions::new().with_descending(true),
        );
    }

    #[test]
    fn test_timestamp_order() {
        let opts = ValueOptions::new();
        let encoded: Vec<Vec<u8>> = [-1_000_000_000i64, -1, 0, 1, 1_000_000_000]
            .iter()
            .map(|ns| {
                let mut out = Vec::new();
                encode_value(
                    &Type::Timestamp,
                    &Value::Timestamp(Timestamp::from_nanoseconds(*ns)),
                    &mut out,
                    opts,
                )
                .unwrap();
                out
            })
            .collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(sorted, encoded);
    }

    #[test]
    fn test_encode_duration() {
        roundtrip(
            &Type::Duration,
            Value::Duration(Duration::from_nanoseconds(86_400_000_000_000)),
            ValueOptions::new(),
        );
    }

    #[test]
    fn test_datetime_with_wire_zone() {
        let ty = Type::DateTime { fixed_zone: None };
        let value = Value::DateTime(DateTime::new(
            Timestamp::from_nanoseconds(1_600_000_000_000_000_000),
            "Europe/Amsterdam",
        ));
        roundtrip(&ty, value.clone(), ValueOptions::new());
        roundtrip(&ty, value.clone(), ValueOptions::new().with_descending(true));
        roundtrip(&ty, value, ValueOptions::new().with_comparable(true));
    }

    #[test]
    fn test_datetime_with_fixed_zone() {
        let ty = Type::DateTime {
            fixed_zone: Some("UTC".into()),
        };
        let value = Value::DateTime(DateTime::new(Timestamp::from_nanoseconds(7), "UTC"));
        let bytes = roundtrip(&ty, value, ValueOptions::new());
        // only the timestamp reaches the wire
        assert_eq!(bytes.len(), 8);
    }

    #[test]
    fn test_datetime_zone_mismatch() {
        let ty = Type::DateTime {
            fixed_zone: Some("UTC".into()),
        };
        let value = Value::DateTime(DateTime::new(Timestamp::from_nanoseconds(7), "Europe/Oslo"));
        let mut out = Vec::new();
        let err = encode_value(&ty, &value, &mut out, ValueOptions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MismatchingValueType);
    }
}
