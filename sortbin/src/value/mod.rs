//! The value model
//!
//! [`Value`] is the tagged variant parallel to [`Kind`]: an untyped tree
//! that any descriptor of matching shape can encode. [`TypedValue`] pairs a
//! value with its descriptor and carries the full codec capability:
//! encode, decode, marshal, unmarshal, skip, describe.

use std::fmt::Display;
use std::io;

use ordered_float::OrderedFloat;
use serde_bytes::ByteBuf;

use crate::codec;
use crate::error::Error;
use crate::kind::Kind;
use crate::options::ValueOptions;
use crate::primitives::{DateTime, Duration, Timestamp};
use crate::read::{IoReader, ReadSeek, SliceReader};
use crate::types::Type;

pub(crate) mod cursor;
pub(crate) mod map;

pub use cursor::{CancelToken, MapCursor};
pub use map::OrderedMap;

/// A decoded or to-be-encoded value
///
/// Composite variants own their children; `Nullable` is either the null
/// sentinel or a child; `OneOf` is an index plus the selected child; `Any`
/// owns its own descriptor. Floats are wrapped in [`OrderedFloat`] so
/// values are `Eq + Ord + Hash` and can key maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// The absent value; cannot be encoded
    Undefined,

    /// True or false
    Boolean(bool),

    /// Variable-length signed integer
    Int(i64),

    /// 8-bit signed integer
    Int8(i8),

    /// 16-bit signed integer
    Int16(i16),

    /// 32-bit signed integer
    Int32(i32),

    /// 64-bit signed integer
    Int64(i64),

    /// Variable-length unsigned integer
    Uint(u64),

    /// 8-bit unsigned integer
    Uint8(u8),

    /// 16-bit unsigned integer
    Uint16(u16),

    /// 32-bit unsigned integer
    Uint32(u32),

    /// 64-bit unsigned integer
    Uint64(u64),

    /// IEEE 754 binary32
    Float32(OrderedFloat<f32>),

    /// IEEE 754 binary64
    Float64(OrderedFloat<f64>),

    /// UTF-8 string
    String(String),

    /// Raw byte buffer
    Bytes(ByteBuf),

    /// Signed nanosecond count
    Duration(Duration),

    /// Nanoseconds since the UTC epoch
    Timestamp(Timestamp),

    /// Instant plus zone identity
    DateTime(DateTime),

    /// A declared enum constant
    Enum(u64),

    /// Homogeneous sequence of child values
    Array(Vec<Value>),

    /// Ordered unique-key mapping
    Map(OrderedMap<Value, Value>),

    /// One child per declared field, in declaration order
    Struct(Vec<Value>),

    /// A child value or the null sentinel
    Nullable(Option<Box<Value>>),

    /// The selected variant and its value
    OneOf {
        /// Position of the selected variant in the descriptor
        index: u64,
        /// The selected value
        value: Box<Value>,
    },

    /// A self-described pair of descriptor and value
    Any {
        /// The descriptor that travels with the value
        ty: Box<Type>,
        /// The described value
        value: Box<Value>,
    },
}

impl Value {
    /// The kind tag of this value's variant
    pub fn kind(&self) -> Kind {
        match self {
            Value::Undefined => Kind::Undefined,
            Value::Boolean(_) => Kind::Boolean,
            Value::Int(_) => Kind::Int,
            Value::Int8(_) => Kind::Int8,
            Value::Int16(_) => Kind::Int16,
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::Uint(_) => Kind::Uint,
            Value::Uint8(_) => Kind::Uint8,
            Value::Uint16(_) => Kind::Uint16,
            Value::Uint32(_) => Kind::Uint32,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float32(_) => Kind::Float32,
            Value::Float64(_) => Kind::Float64,
            Value::String(_) => Kind::String,
            Value::Bytes(_) => Kind::Bytes,
            Value::Duration(_) => Kind::Duration,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::DateTime(_) => Kind::DateTime,
            Value::Enum(_) => Kind::Enum,
            Value::Array(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Struct(_) => Kind::Struct,
            Value::Nullable(_) => Kind::Nullable,
            Value::OneOf { .. } => Kind::OneOf,
            Value::Any { .. } => Kind::Any,
        }
    }

    /// The empty default of a type: what a compatibility-mode decode puts
    /// in a field whose ordinal was missing from the stream
    pub fn empty_of(ty: &Type) -> Value {
        match ty {
            Type::Undefined => Value::Undefined,
            Type::Boolean => Value::Boolean(false),
            Type::Int => Value::Int(0),
            Type::Int8 => Value::Int8(0),
            Type::Int16 => Value::Int16(0),
            Type::Int32 => Value::Int32(0),
            Type::Int64 => Value::Int64(0),
            Type::Uint => Value::Uint(0),
            Type::Uint8 => Value::Uint8(0),
            Type::Uint16 => Value::Uint16(0),
            Type::Uint32 => Value::Uint32(0),
            Type::Uint64 => Value::Uint64(0),
            Type::Float32 => Value::Float32(0.0.into()),
            Type::Float64 => Value::Float64(0.0.into()),
            Type::String => Value::String(String::new()),
            Type::Bytes { fixed_size } => Value::Bytes(ByteBuf::from(vec![0u8; *fixed_size])),
            Type::Duration => Value::Duration(Duration::from_nanoseconds(0)),
            Type::Timestamp => Value::Timestamp(Timestamp::from_nanoseconds(0)),
            Type::DateTime { fixed_zone } => Value::DateTime(DateTime::new(
                Timestamp::from_nanoseconds(0),
                fixed_zone.clone().unwrap_or_default(),
            )),
            Type::Enum(en) => Value::Enum(en.elements.first().map(|e| e.value).unwrap_or(0)),
            Type::Array(at) => {
                let elems = (0..at.fixed_size).map(|_| Value::empty_of(&at.elem)).collect();
                Value::Array(elems)
            }
            Type::Map(_) => Value::Map(OrderedMap::new()),
            Type::Struct(st) => {
                Value::Struct(st.fields.iter().map(|f| Value::empty_of(&f.ty)).collect())
            }
            Type::Nullable(_) => Value::Nullable(None),
            Type::OneOf(oneof) => Value::OneOf {
                index: 0,
                value: Box::new(
                    oneof
                        .elements
                        .first()
                        .map(Value::empty_of)
                        .unwrap_or(Value::Undefined),
                ),
            },
            Type::Named(named) => Value::empty_of(&named.inner),
            Type::Any => Value::Any {
                ty: Box::new(Type::Undefined),
                value: Box::new(Value::Undefined),
            },
        }
    }
}

macro_rules! impl_from_for_value {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::$variant(val.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    String(&str),
    Duration(Duration),
    Timestamp(Timestamp),
    DateTime(DateTime),
}

impl From<Vec<u8>> for Value {
    fn from(val: Vec<u8>) -> Self {
        Value::Bytes(ByteBuf::from(val))
    }
}

impl From<Vec<Value>> for Value {
    fn from(val: Vec<Value>) -> Self {
        Value::Array(val)
    }
}

impl From<OrderedMap<Value, Value>> for Value {
    fn from(val: OrderedMap<Value, Value>) -> Self {
        Value::Map(val)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => {
                write!(f, "0x")?;
                for b in v.iter().take(16) {
                    write!(f, "{:02x}", b)?;
                }
                if v.len() > 16 {
                    write!(f, "..{}b", v.len())?;
                }
                Ok(())
            }
            Value::Duration(v) => write!(f, "{}ns", v.nanoseconds()),
            Value::Timestamp(v) => write!(f, "@{}ns", v.nanoseconds()),
            Value::DateTime(v) => write!(f, "@{}ns[{}]", v.timestamp.nanoseconds(), v.zone),
            Value::Enum(v) => write!(f, "#{}", v),
            Value::Array(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Struct(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
            Value::Nullable(None) => write!(f, "null"),
            Value::Nullable(Some(inner)) => write!(f, "{}", inner),
            Value::OneOf { index, value } => write!(f, "#{}:{}", index, value),
            Value::Any { ty, value } => write!(f, "{}:{}", ty, value),
        }
    }
}

/// A value paired with its declared type: the full codec capability
///
/// Everything the ordered store's higher layers need from a value goes
/// through here. `decode` and `unmarshal` replace the held value in place;
/// `Display` renders the human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    ty: Type,
    value: Value,
}

impl TypedValue {
    /// Pairs a value with its declared type.
    ///
    /// The value's shape is checked shallowly; deeper mismatches surface on
    /// encode.
    pub fn new(ty: Type, value: Value) -> Result<Self, Error> {
        if !ty.admits(&value) {
            return Err(Error::mismatching(ty.kind(), value.kind()));
        }
        Ok(Self { ty, value })
    }

    /// The empty default of `ty`, ready to be decoded into
    pub fn empty(ty: Type) -> Self {
        let value = Value::empty_of(&ty);
        Self { ty, value }
    }

    /// The declared type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The declared type's kind
    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    /// The held value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the pair into the held value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Consumes the pair into its parts
    pub fn into_parts(self) -> (Type, Value) {
        (self.ty, self.value)
    }

    /// Encodes the held value onto `writer`; returns bytes written
    pub fn encode<W: io::Write>(&self, writer: &mut W, opts: ValueOptions) -> Result<usize, Error> {
        codec::encode_value(&self.ty, &self.value, writer, opts)
    }

    /// Decodes one value off `reader`, replacing the held value; returns
    /// bytes read.
    ///
    /// On error the held value is unchanged.
    pub fn decode<R: io::Read>(&mut self, reader: R, opts: ValueOptions) -> Result<usize, Error> {
        let mut reader = IoReader::new(reader);
        let (value, n) = codec::decode_value(&self.ty, &mut reader, opts)?;
        self.value = value;
        Ok(n)
    }

    /// Encodes into a fresh buffer
    pub fn marshal(&self, opts: ValueOptions) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode(&mut out, opts)?;
        Ok(out)
    }

    /// Decodes from a byte slice, replacing the held value; returns bytes
    /// consumed
    pub fn unmarshal(&mut self, bytes: &[u8], opts: ValueOptions) -> Result<usize, Error> {
        let mut reader = SliceReader::new(bytes);
        let (value, n) = codec::decode_value(&self.ty, &mut reader, opts)?;
        self.value = value;
        Ok(n)
    }

    /// Advances `reader` past one value of this type without materializing
    /// it; returns bytes skipped
    pub fn skip(&self, reader: &mut dyn ReadSeek, opts: ValueOptions) -> Result<usize, Error> {
        codec::skip_value(&self.ty, reader, opts)
    }
}

impl Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.ty, self.value)
    }
}
