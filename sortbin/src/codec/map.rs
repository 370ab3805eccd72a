//! Map encoding
//!
//! An ascending `Uint` entry count followed by `key ; value` pairs. Entries
//! are emitted in ascending order of the canonical encoded key (always the
//! ascending comparable form of the key type, whatever the outer options),
//! so the bytes do not depend on insertion order. Key and value options
//! derive from the outer options by XOR-ing the per-element descending
//! flags declared on the map type.

use std::io::Write;

use crate::error::Error;
use crate::kind::Kind;
use crate::options::ValueOptions;
use crate::read::{Read, ReadSeek};
use crate::types::{MapType, Type};
use crate::value::{OrderedMap, Value};

use super::varint::{decode_uint, encode_uint};
use super::{decode_value, encode_value, skip_value, Codec, MAX_PREALLOC};

/// Map codec
pub(crate) struct MapCodec;

impl MapCodec {
    fn descriptor(ty: &Type) -> Result<&MapType, Error> {
        match ty {
            Type::Map(mt) => Ok(mt),
            _ => Err(Error::invalid_type("map codec invoked with a non-map descriptor")),
        }
    }

    fn check_defined(mt: &MapType) -> Result<(), Error> {
        if mt.key.resolve().kind() == Kind::Undefined {
            return Err(Error::undefined("map key"));
        }
        if mt.value.resolve().kind() == Kind::Undefined {
            return Err(Error::undefined("map value"));
        }
        Ok(())
    }
}

impl Codec for MapCodec {
    fn encode(
        &self,
        ty: &Type,
        value: &Value,
        writer: &mut dyn Write,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let mt = Self::descriptor(ty)?;
        let map = match value {
            Value::Map(map) => map,
            _ => return Err(Error::mismatching(ty.kind(), value.kind())),
        };
        Self::check_defined(mt)?;

        let key_opts = opts.xor_descending(mt.descending_keys);
        let value_opts = opts.xor_descending(mt.descending_values);

        // Sort by the canonical form of each key so the output bytes are a
        // pure function of the entry set.
        let mut entries = Vec::with_capacity(map.len());
        for (k, v) in map.iter() {
            if !mt.key.admits(k) {
                return Err(Error::mismatching(mt.key.kind(), k.kind()));
            }
            if !mt.value.admits(v) {
                return Err(Error::mismatching(mt.value.kind(), v.kind()));
            }
            let mut canonical = Vec::new();
            encode_value(&mt.key, k, &mut canonical, ValueOptions::canonical())?;
            entries.push((canonical, k, v));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::invalid_value("map keys encode to the same bytes")
                .with_detail("key", &pair[0].1));
        }

        let mut n = encode_uint(writer, entries.len() as u64, 0)?;
        for (_, k, v) in &entries {
            n += encode_value(&mt.key, k, writer, key_opts)
                .map_err(|e| e.with_detail("bytes_before_failure", n))?;
            n += encode_value(&mt.value, v, writer, value_opts)
                .map_err(|e| e.with_detail("bytes_before_failure", n))?;
        }
        Ok(n)
    }

    fn decode(
        &self,
        ty: &Type,
        reader: &mut dyn Read,
        opts: ValueOptions,
    ) -> Result<(Value, usize), Error> {
        let mt = Self::descriptor(ty)?;
        Self::check_defined(mt)?;

        let key_opts = opts.xor_descending(mt.descending_keys);
        let value_opts = opts.xor_descending(mt.descending_values);

        let (count, mut n) = decode_uint(reader, 0)?;
        let count = usize::try_from(count)
            .map_err(|_| Error::decoding("map count overflows").with_detail("count", count))?;

        // Wire order is the canonical key order; inserting as entries
        // arrive preserves it.
        let mut map = OrderedMap::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let (k, k_n) = decode_value(&mt.key, reader, key_opts)
                .map_err(|e| e.with_detail("bytes_before_failure", n))?;
            n += k_n;
            let (v, v_n) = decode_value(&mt.value, reader, value_opts)
                .map_err(|e| e.with_detail("bytes_before_failure", n))?;
            n += v_n;
            if map.insert(k, v).is_some() {
                return Err(Error::decoding("duplicate map key"));
            }
        }
        Ok((Value::Map(map), n))
    }

    fn skip(
        &self,
        ty: &Type,
        reader: &mut dyn ReadSeek,
        opts: ValueOptions,
    ) -> Result<usize, Error> {
        let mt = Self::descriptor(ty)?;
        Self::check_defined(mt)?;

        let key_opts = opts.xor_descending(mt.descending_keys);
        let value_opts = opts.xor_descending(mt.descending_values);

        let (count, mut n) = decode_uint(reader.as_read(), 0)?;
        for _ in 0..count {
            n += skip_value(&mt.key, reader, key_opts)?;
            n += skip_value(&mt.value, reader, value_opts)?;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode_value, encode_value, skip_value};
    use crate::options::ValueOptions;
    use crate::read::SliceReader;
    use crate::types::{MapType, Type};
    use crate::value::{OrderedMap, Value};

    fn string_int_map() -> Type {
        Type::Map(MapType::new(Type::String, Type::Int32))
    }

    fn sample() -> Value {
        let mut map = OrderedMap::new();
        map.insert(Value::String("foo".into()), Value::Int32(42));
        map.insert(Value::String("bar".into()), Value::Int32(43));
        map.insert(Value::String("goo".into()), Value::Int32(44));
        Value::Map(map)
    }

    fn roundtrip_bytes(ty: &Type, value: &Value, opts: ValueOptions) -> Vec<u8> {
        let mut out = Vec::new();
        let written = encode_value(ty, value, &mut out, opts).unwrap();
        assert_eq!(written, out.len());

        let mut reader = SliceReader::new(&out);
        let (decoded, read) = decode_value(ty, &mut reader, opts).unwrap();
        assert_eq!(read, out.len());
        assert_eq!(&decoded, value);

        let mut reader = SliceReader::new(&out);
        assert_eq!(skip_value(ty, &mut reader, opts).unwrap(), out.len());

        out
    }

    #[test]
    fn test_encode_map_sorted_by_key() {
        let ty = string_int_map();
        let bytes = roundtrip_bytes(&ty, &sample(), ValueOptions::new());

        let mut expected = vec![0x01, 0x03];
        for (k, v) in [("bar", 43i32), ("foo", 42), ("goo", 44)] {
            expected.push(0x01);
            expected.push(k.len() as u8);
            expected.extend_from_slice(k.as_bytes());
            expected.extend_from_slice(&(v as u32 ^ 0x8000_0000).to_be_bytes());
        }
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_map_bytes_independent_of_insertion_order() {
        let ty = string_int_map();
        let mut reversed = OrderedMap::new();
        reversed.insert(Value::String("goo".into()), Value::Int32(44));
        reversed.insert(Value::String("foo".into()), Value::Int32(42));
        reversed.insert(Value::String("bar".into()), Value::Int32(43));

        let a = roundtrip_bytes(&ty, &sample(), ValueOptions::new());
        let b = roundtrip_bytes(&ty, &Value::Map(reversed), ValueOptions::new());
        assert_eq!(a, b);
    }

    #[test]
    fn test_decoded_iteration_is_key_ascending() {
        let ty = string_int_map();
        let bytes = roundtrip_bytes(&ty, &sample(), ValueOptions::new());

        let mut reader = SliceReader::new(&bytes);
        let (decoded, _) = decode_value(&ty, &mut reader, ValueOptions::new()).unwrap();
        let keys: Vec<String> = match &decoded {
            Value::Map(map) => map
                .iter()
                .map(|(k, _)| match k {
                    Value::String(s) => s.clone(),
                    _ => panic!("wrong key variant"),
                })
                .collect(),
            _ => panic!("wrong variant"),
        };
        assert_eq!(keys, vec!["bar", "foo", "goo"]);
    }

    #[test]
    fn test_map_descending_and_comparable() {
        let ty = string_int_map();
        roundtrip_bytes(&ty, &sample(), ValueOptions::new().with_descending(true));
        roundtrip_bytes(&ty, &sample(), ValueOptions::new().with_comparable(true));
    }

    #[test]
    fn test_per_element_descending_flags() {
        let ty = Type::Map(
            MapType::new(Type::String, Type::Int32)
                .with_descending_keys(true)
                .with_descending_values(true),
        );
        // Outer ascending with descending elements, and the double-flip
        // back under an outer descending call.
        roundtrip_bytes(&ty, &sample(), ValueOptions::new());
        roundtrip_bytes(&ty, &sample(), ValueOptions::new().with_descending(true));
    }

    #[test]
    fn test_duplicate_wire_key_is_rejected() {
        let ty = Type::Map(MapType::new(Type::Uint8, Type::Uint8));
        // count=2, entries (1 -> 2), (1 -> 3)
        let bytes = [0x01, 0x02, 0x01, 0x02, 0x01, 0x03];
        let mut reader = SliceReader::new(&bytes);
        let err = decode_value(&ty, &mut reader, ValueOptions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DecodingBinaryValue);
    }

    #[test]
    fn test_empty_map() {
        let ty = string_int_map();
        let bytes = roundtrip_bytes(&ty, &Value::Map(OrderedMap::new()), ValueOptions::new());
        assert_eq!(bytes, vec![0x00]);
    }

    #[test]
    fn test_map_key_type_mismatch() {
        let ty = string_int_map();
        let mut map = OrderedMap::new();
        map.insert(Value::Uint8(1), Value::Int32(2));
        let mut out = Vec::new();
        let err =
            encode_value(&ty, &Value::Map(map), &mut out, ValueOptions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MismatchingValueType);
    }
}
