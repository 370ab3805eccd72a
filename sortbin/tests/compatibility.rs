//! Struct compatibility mode: descriptor evolution in both directions.

use sortbin::read::SliceReader;
use sortbin::types::{Field, StructType};
use sortbin::{from_slice, skip, to_vec, Type, Value, ValueOptions};

fn compat() -> ValueOptions {
    ValueOptions::new().with_compatibility_mode(true)
}

fn v1() -> Type {
    Type::Struct(StructType::new(vec![
        Field::new("id", Type::Uint).with_ordinal(1),
        Field::new("name", Type::String).with_ordinal(2),
    ]))
}

fn v2() -> Type {
    Type::Struct(StructType::new(vec![
        Field::new("id", Type::Uint).with_ordinal(1),
        Field::new("name", Type::String).with_ordinal(2),
        Field::new("email", Type::String).with_ordinal(3),
        Field::new("active", Type::Boolean).with_ordinal(4),
    ]))
}

#[test]
fn superset_encoding_decodes_against_subset() {
    let value = Value::Struct(vec![
        Value::Uint(12),
        Value::String("kim".into()),
        Value::String("kim@example.com".into()),
        Value::Boolean(true),
    ]);
    let bytes = to_vec(&v2(), &value, compat()).unwrap();

    // Unknown ordinals 3 and 4 are skipped by their body sizes.
    let decoded = from_slice(&v1(), &bytes, compat()).unwrap();
    assert_eq!(
        decoded,
        Value::Struct(vec![Value::Uint(12), Value::String("kim".into())])
    );
}

#[test]
fn subset_encoding_decodes_against_superset() {
    let value = Value::Struct(vec![Value::Uint(12), Value::String("kim".into())]);
    let bytes = to_vec(&v1(), &value, compat()).unwrap();

    // Missing ordinals 3 and 4 come back as their empty defaults.
    let decoded = from_slice(&v2(), &bytes, compat()).unwrap();
    assert_eq!(
        decoded,
        Value::Struct(vec![
            Value::Uint(12),
            Value::String("kim".into()),
            Value::String(String::new()),
            Value::Boolean(false),
        ])
    );
}

#[test]
fn compat_roundtrip_same_descriptor() {
    let value = Value::Struct(vec![
        Value::Uint(1),
        Value::String("same".into()),
        Value::String("s@e".into()),
        Value::Boolean(false),
    ]);
    let bytes = to_vec(&v2(), &value, compat()).unwrap();
    assert_eq!(from_slice(&v2(), &bytes, compat()).unwrap(), value);

    let mut reader = SliceReader::new(&bytes);
    assert_eq!(skip(&v2(), &mut reader, compat()).unwrap(), bytes.len());
}

#[test]
fn compat_skip_needs_no_descriptor_knowledge() {
    // Skip walks the frames alone, so even a consumer that knows none of
    // the producer's fields advances correctly.
    let value = Value::Struct(vec![
        Value::Uint(9),
        Value::String("opaque".into()),
        Value::String("x@y".into()),
        Value::Boolean(true),
    ]);
    let mut bytes = to_vec(&v2(), &value, compat()).unwrap();
    let encoded_len = bytes.len();
    bytes.extend_from_slice(&[0xde, 0xad]);

    let stranger = Type::Struct(StructType::new(vec![Field::new(
        "unrelated",
        Type::Int64,
    )
    .with_ordinal(9)]));
    let mut reader = SliceReader::new(&bytes);
    assert_eq!(skip(&stranger, &mut reader, compat()).unwrap(), encoded_len);
    assert_eq!(reader.remaining(), 2);
}

#[test]
fn compat_sparse_ordinals() {
    // Ordinals need not be dense; the header names the largest one.
    let sparse = Type::Struct(StructType::new(vec![
        Field::new("a", Type::Uint8).with_ordinal(2),
        Field::new("b", Type::Uint8).with_ordinal(200),
    ]));
    let value = Value::Struct(vec![Value::Uint8(1), Value::Uint8(2)]);
    let bytes = to_vec(&sparse, &value, compat()).unwrap();
    assert_eq!(&bytes[..2], &[0x01, 200]);
    assert_eq!(from_slice(&sparse, &bytes, compat()).unwrap(), value);
}

#[test]
fn compat_wide_ordinals_use_wider_header() {
    let wide = Type::Struct(StructType::new(vec![
        Field::new("a", Type::Uint8).with_ordinal(1),
        Field::new("b", Type::Uint8).with_ordinal(300),
    ]));
    let value = Value::Struct(vec![Value::Uint8(1), Value::Uint8(2)]);
    let bytes = to_vec(&wide, &value, compat()).unwrap();
    // width byte 2, max ordinal 300 big-endian
    assert_eq!(&bytes[..3], &[0x02, 0x01, 0x2c]);
    assert_eq!(from_slice(&wide, &bytes, compat()).unwrap(), value);
}

#[test]
fn compat_propagates_into_nested_structs() {
    let inner_v1 = StructType::new(vec![Field::new("x", Type::Uint8).with_ordinal(1)]);
    let inner_v2 = StructType::new(vec![
        Field::new("x", Type::Uint8).with_ordinal(1),
        Field::new("y", Type::Uint8).with_ordinal(2),
    ]);
    let outer = |inner: StructType| {
        Type::Struct(StructType::new(vec![
            Field::new("inner", Type::Struct(inner)).with_ordinal(1),
            Field::new("tail", Type::Uint8).with_ordinal(2),
        ]))
    };

    let value = Value::Struct(vec![
        Value::Struct(vec![Value::Uint8(5), Value::Uint8(6)]),
        Value::Uint8(7),
    ]);
    let bytes = to_vec(&outer(inner_v2), &value, compat()).unwrap();

    let decoded = from_slice(&outer(inner_v1), &bytes, compat()).unwrap();
    assert_eq!(
        decoded,
        Value::Struct(vec![Value::Struct(vec![Value::Uint8(5)]), Value::Uint8(7)])
    );
}

#[test]
fn compat_descending_bodies() {
    // Frame metadata stays ascending while field bodies honor descending.
    let value = Value::Struct(vec![Value::Uint(1), Value::String("d".into())]);
    let opts = compat().with_descending(true);
    let bytes = to_vec(&v1(), &value, opts).unwrap();
    assert_eq!(&bytes[..2], &[0x01, 0x02]);
    assert_eq!(from_slice(&v1(), &bytes, opts).unwrap(), value);
}
