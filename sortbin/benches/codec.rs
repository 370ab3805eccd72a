#![allow(clippy::all)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, RngCore};
use sortbin::types::{Field, MapType, StructType};
use sortbin::value::OrderedMap;
use sortbin::{from_slice, to_vec, Type, Value, ValueOptions};

fn criterion_benchmark(c: &mut Criterion) {
    let opts = ValueOptions::new();
    let comparable = ValueOptions::new().with_comparable(true);
    let mut rng = rand::thread_rng();

    let value = Value::Boolean(rng.gen());
    c.bench_function("encode bool", |b| {
        b.iter(|| to_vec(&Type::Boolean, black_box(&value), opts).unwrap())
    });

    let value = Value::Uint(rng.gen());
    c.bench_function("encode uint", |b| {
        b.iter(|| to_vec(&Type::Uint, black_box(&value), opts).unwrap())
    });

    let value = Value::Int(rng.gen());
    c.bench_function("encode int comparable", |b| {
        b.iter(|| to_vec(&Type::Int, black_box(&value), comparable).unwrap())
    });

    let value = Value::Float64(rng.gen::<f64>().into());
    c.bench_function("encode f64", |b| {
        b.iter(|| to_vec(&Type::Float64, black_box(&value), opts).unwrap())
    });

    let mut payload = vec![0u8; 256];
    rng.fill_bytes(&mut payload);
    let value = Value::Bytes(serde_bytes::ByteBuf::from(payload));
    c.bench_function("encode bytes 256", |b| {
        b.iter(|| to_vec(&Type::bytes(), black_box(&value), opts).unwrap())
    });
    c.bench_function("encode bytes 256 comparable", |b| {
        b.iter(|| to_vec(&Type::bytes(), black_box(&value), comparable).unwrap())
    });

    let ty = Type::array(Type::Uint32);
    let value = Value::Array((0..64).map(|_| Value::Uint32(rng.gen())).collect());
    c.bench_function("encode array of 64 u32", |b| {
        b.iter(|| to_vec(&ty, black_box(&value), opts).unwrap())
    });
    let bytes = to_vec(&ty, &value, opts).unwrap();
    c.bench_function("decode array of 64 u32", |b| {
        b.iter(|| from_slice(&ty, black_box(&bytes), opts).unwrap())
    });

    let ty = Type::Map(MapType::new(Type::String, Type::Uint64));
    let mut map = OrderedMap::new();
    for i in 0..32 {
        map.insert(Value::String(format!("key-{:04}", i)), Value::Uint64(i));
    }
    let value = Value::Map(map);
    c.bench_function("encode map of 32", |b| {
        b.iter(|| to_vec(&ty, black_box(&value), opts).unwrap())
    });

    let ty = Type::Struct(StructType::new(vec![
        Field::new("id", Type::Uint),
        Field::new("name", Type::String),
        Field::new("flag_a", Type::Boolean),
        Field::new("flag_b", Type::Boolean),
        Field::new("score", Type::Int64),
    ]));
    let value = Value::Struct(vec![
        Value::Uint(rng.gen()),
        Value::String("benchmark row".into()),
        Value::Boolean(true),
        Value::Boolean(false),
        Value::Int64(rng.gen()),
    ]);
    c.bench_function("encode struct packed", |b| {
        b.iter(|| to_vec(&ty, black_box(&value), opts).unwrap())
    });
    let compat = ValueOptions::new().with_compatibility_mode(true);
    c.bench_function("encode struct compat", |b| {
        b.iter(|| to_vec(&ty, black_box(&value), compat).unwrap())
    });
    let bytes = to_vec(&ty, &value, compat).unwrap();
    c.bench_function("decode struct compat", |b| {
        b.iter(|| from_slice(&ty, black_box(&bytes), compat).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
