//! Type descriptors
//!
//! A [`Type`] is an immutable description of a wire type: everything the
//! codec needs to encode, decode, or skip any value of that type. Composite
//! descriptors own their children. Descriptors also have a wire form of
//! their own (kind byte plus parameters, always canonical ascending), which
//! is what makes `Any` self-describing.

use std::convert::TryFrom;
use std::fmt::Display;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::codec::primitive::write_all;
use crate::codec::text::{decode_len_prefixed, encode_len_prefixed};
use crate::codec::varint::{decode_uint, encode_uint};
use crate::error::Error;
use crate::kind::Kind;
use crate::options::ValueOptions;
use crate::read::Read;
use crate::value::Value;

/// Deepest admissible descriptor nesting on decode
const MAX_TYPE_DEPTH: usize = 128;

/// Width in bytes of an enum or oneof index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndexWidth {
    /// One byte
    One = 1,
    /// Two bytes
    Two = 2,
    /// Four bytes
    Four = 4,
    /// Eight bytes
    Eight = 8,
}

impl IndexWidth {
    /// The width in bytes
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Parses a width byte off the wire
    pub(crate) fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            1 => Ok(IndexWidth::One),
            2 => Ok(IndexWidth::Two),
            4 => Ok(IndexWidth::Four),
            8 => Ok(IndexWidth::Eight),
            _ => Err(Error::decoding("invalid index width").with_detail("byte", byte)),
        }
    }
}

/// One declared enum constant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnumElement {
    /// Human-readable name of the constant
    pub name: String,
    /// The unsigned value that reaches the wire
    pub value: u64,
}

impl EnumElement {
    /// Creates a new element
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Parameters of an enum type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnumType {
    /// Wire width of the constant
    pub index_bytes: IndexWidth,
    /// The closed set of declared constants
    pub elements: Vec<EnumElement>,
}

impl EnumType {
    /// Creates a new enum descriptor
    pub fn new(index_bytes: IndexWidth, elements: Vec<EnumElement>) -> Self {
        Self {
            index_bytes,
            elements,
        }
    }
}

/// Parameters of an array type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArrayType {
    /// The element type
    pub elem: Box<Type>,
    /// Element count when fixed; zero means variable-size
    pub fixed_size: usize,
}

impl ArrayType {
    /// Creates a variable-size array descriptor
    pub fn new(elem: Type) -> Self {
        Self {
            elem: Box::new(elem),
            fixed_size: 0,
        }
    }

    /// Creates a fixed-size array descriptor
    pub fn fixed(elem: Type, fixed_size: usize) -> Self {
        Self {
            elem: Box::new(elem),
            fixed_size,
        }
    }
}

/// Parameters of a map type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapType {
    /// The key type
    pub key: Box<Type>,
    /// The value type
    pub value: Box<Type>,
    /// Encode keys descending relative to the call
    pub descending_keys: bool,
    /// Encode values descending relative to the call
    pub descending_values: bool,
}

impl MapType {
    /// Creates a new map descriptor with ascending keys and values
    pub fn new(key: Type, value: Type) -> Self {
        Self {
            key: Box::new(key),
            value: Box::new(value),
            descending_keys: false,
            descending_values: false,
        }
    }

    /// Returns a copy with the key direction flag set
    pub fn with_descending_keys(mut self, descending: bool) -> Self {
        self.descending_keys = descending;
        self
    }

    /// Returns a copy with the value direction flag set
    pub fn with_descending_values(mut self, descending: bool) -> Self {
        self.descending_values = descending;
        self
    }
}

/// One declared struct field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Compatibility-mode ordinal; stable across descriptor revisions
    pub ordinal: u32,
    /// Encode this field descending relative to the call
    pub descending: bool,
    /// The field's type
    pub ty: Type,
}

impl Field {
    /// Creates a field; the ordinal is assigned from the declaration
    /// position by [`StructType::new`] unless overridden
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            descending: false,
            ty,
        }
    }

    /// Returns a copy with an explicit ordinal
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Returns a copy with the direction flag set
    pub fn with_descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }
}

/// Parameters of a struct type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructType {
    /// The declared fields, in declaration order
    pub fields: Vec<Field>,
}

impl StructType {
    /// Creates a struct descriptor; fields without an explicit ordinal get
    /// their one-based declaration position
    pub fn new(mut fields: Vec<Field>) -> Self {
        for (i, field) in fields.iter_mut().enumerate() {
            if field.ordinal == 0 {
                field.ordinal = (i + 1) as u32;
            }
        }
        Self { fields }
    }
}

/// Parameters of a oneof type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OneOfType {
    /// Wire width of the variant index
    pub index_bytes: IndexWidth,
    /// The declared variants; the wire index is the position here
    pub elements: Vec<Type>,
}

impl OneOfType {
    /// Creates a new oneof descriptor
    pub fn new(index_bytes: IndexWidth, elements: Vec<Type>) -> Self {
        Self {
            index_bytes,
            elements,
        }
    }
}

/// Parameters of a named type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamedType {
    /// The label
    pub name: String,
    /// The type the label delegates to
    pub inner: Box<Type>,
}

/// An immutable type descriptor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    /// The absent type; rejects every operation
    Undefined,
    /// One-byte true/false
    Boolean,
    /// Variable-length signed integer
    Int,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Variable-length unsigned integer
    Uint,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// IEEE 754 binary32
    Float32,
    /// IEEE 754 binary64
    Float64,
    /// UTF-8 string
    String,
    /// Raw byte buffer; `fixed_size > 0` drops all framing
    Bytes {
        /// Exact payload length, or zero for variable-size
        fixed_size: usize,
    },
    /// Signed nanosecond count
    Duration,
    /// Nanoseconds since the UTC epoch
    Timestamp,
    /// Instant plus zone identity
    DateTime {
        /// When set, the zone stays off the wire and is supplied on decode
        fixed_zone: Option<String>,
    },
    /// Closed set of named unsigned constants
    Enum(EnumType),
    /// Homogeneous sequence
    Array(ArrayType),
    /// Ordered unique-key mapping
    Map(MapType),
    /// Fixed field tuple
    Struct(StructType),
    /// A value or the null sentinel
    Nullable(Box<Type>),
    /// One variant out of a declared list
    OneOf(OneOfType),
    /// Labeling indirection
    Named(NamedType),
    /// Self-describing descriptor/value pair
    Any,
}

impl Type {
    /// Convenience: a variable-size array of `elem`
    pub fn array(elem: Type) -> Self {
        Type::Array(ArrayType::new(elem))
    }

    /// Convenience: a fixed-size array of `elem`
    pub fn array_fixed(elem: Type, fixed_size: usize) -> Self {
        Type::Array(ArrayType::fixed(elem, fixed_size))
    }

    /// Convenience: a variable-size byte buffer
    pub fn bytes() -> Self {
        Type::Bytes { fixed_size: 0 }
    }

    /// Convenience: a nullable wrapper around `inner`
    pub fn nullable(inner: Type) -> Self {
        Type::Nullable(Box::new(inner))
    }

    /// Convenience: a named label over `inner`
    pub fn named(name: impl Into<String>, inner: Type) -> Self {
        Type::Named(NamedType {
            name: name.into(),
            inner: Box::new(inner),
        })
    }

    /// The kind tag of this descriptor
    pub fn kind(&self) -> Kind {
        match self {
            Type::Undefined => Kind::Undefined,
            Type::Boolean => Kind::Boolean,
            Type::Int => Kind::Int,
            Type::Int8 => Kind::Int8,
            Type::Int16 => Kind::Int16,
            Type::Int32 => Kind::Int32,
            Type::Int64 => Kind::Int64,
            Type::Uint => Kind::Uint,
            Type::Uint8 => Kind::Uint8,
            Type::Uint16 => Kind::Uint16,
            Type::Uint32 => Kind::Uint32,
            Type::Uint64 => Kind::Uint64,
            Type::Float32 => Kind::Float32,
            Type::Float64 => Kind::Float64,
            Type::String => Kind::String,
            Type::Bytes { .. } => Kind::Bytes,
            Type::Duration => Kind::Duration,
            Type::Timestamp => Kind::Timestamp,
            Type::DateTime { .. } => Kind::DateTime,
            Type::Enum(_) => Kind::Enum,
            Type::Array(_) => Kind::Array,
            Type::Map(_) => Kind::Map,
            Type::Struct(_) => Kind::Struct,
            Type::Nullable(_) => Kind::Nullable,
            Type::OneOf(_) => Kind::OneOf,
            Type::Named(_) => Kind::Named,
            Type::Any => Kind::Any,
        }
    }

    /// Unwraps `Named` labels down to the behavioral type
    pub fn resolve(&self) -> &Type {
        let mut ty = self;
        while let Type::Named(named) = ty {
            ty = &named.inner;
        }
        ty
    }

    /// Shallow structural check: does `value`'s variant satisfy this type?
    ///
    /// Composite codecs check one level as they recurse, so the check stays
    /// linear over the encoded tree.
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self.resolve(), value),
            (Type::Boolean, Value::Boolean(_))
                | (Type::Int, Value::Int(_))
                | (Type::Int8, Value::Int8(_))
                | (Type::Int16, Value::Int16(_))
                | (Type::Int32, Value::Int32(_))
                | (Type::Int64, Value::Int64(_))
                | (Type::Uint, Value::Uint(_))
                | (Type::Uint8, Value::Uint8(_))
                | (Type::Uint16, Value::Uint16(_))
                | (Type::Uint32, Value::Uint32(_))
                | (Type::Uint64, Value::Uint64(_))
                | (Type::Float32, Value::Float32(_))
                | (Type::Float64, Value::Float64(_))
                | (Type::String, Value::String(_))
                | (Type::Bytes { .. }, Value::Bytes(_))
                | (Type::Duration, Value::Duration(_))
                | (Type::Timestamp, Value::Timestamp(_))
                | (Type::DateTime { .. }, Value::DateTime(_))
                | (Type::Enum(_), Value::Enum(_))
                | (Type::Array(_), Value::Array(_))
                | (Type::Map(_), Value::Map(_))
                | (Type::Struct(_), Value::Struct(_))
                | (Type::Nullable(_), Value::Nullable(_))
                | (Type::OneOf(_), Value::OneOf { .. })
                | (Type::Any, Value::Any { .. })
        )
    }

    /// Encoded width when it is a constant for this type under `opts`,
    /// which lets skip seek instead of scanning
    pub(crate) fn fixed_encoded_width(&self, opts: ValueOptions) -> Option<usize> {
        match self.resolve() {
            Type::Boolean | Type::Int8 | Type::Uint8 => Some(1),
            Type::Int16 | Type::Uint16 => Some(2),
            Type::Int32 | Type::Uint32 | Type::Float32 => Some(4),
            Type::Int64 | Type::Uint64 | Type::Float64 | Type::Duration | Type::Timestamp => {
                Some(8)
            }
            Type::Int if opts.comparable => Some(8),
            Type::Bytes { fixed_size } if *fixed_size > 0 => Some(*fixed_size),
            Type::DateTime { fixed_zone: Some(_) } => Some(8),
            Type::Enum(en) => Some(en.index_bytes.bytes()),
            _ => None,
        }
    }

    /// Writes this descriptor in its canonical wire form
    pub fn encode(&self, writer: &mut dyn Write) -> Result<usize, Error> {
        let mut n = write_all(writer, &[self.kind() as u8])?;
        match self {
            Type::Bytes { fixed_size } => {
                n += encode_uint(writer, *fixed_size as u64, 0)?;
            }
            Type::DateTime { fixed_zone } => match fixed_zone {
                Some(zone) => {
                    n += write_all(writer, &[0x01])?;
                    n += encode_len_prefixed(writer, zone.as_bytes(), 0)?;
                }
                None => {
                    n += write_all(writer, &[0x00])?;
                }
            },
            Type::Enum(en) => {
                n += write_all(writer, &[en.index_bytes.bytes() as u8])?;
                n += encode_uint(writer, en.elements.len() as u64, 0)?;
                for element in &en.elements {
                    n += encode_len_prefixed(writer, element.name.as_bytes(), 0)?;
                    n += encode_uint(writer, element.value, 0)?;
                }
            }
            Type::Array(at) => {
                n += encode_uint(writer, at.fixed_size as u64, 0)?;
                n += at.elem.encode(writer)?;
            }
            Type::Map(mt) => {
                let flags = mt.descending_keys as u8 | (mt.descending_values as u8) << 1;
                n += write_all(writer, &[flags])?;
                n += mt.key.encode(writer)?;
                n += mt.value.encode(writer)?;
            }
            Type::Struct(st) => {
                n += encode_uint(writer, st.fields.len() as u64, 0)?;
                for field in &st.fields {
                    n += encode_len_prefixed(writer, field.name.as_bytes(), 0)?;
                    n += encode_uint(writer, field.ordinal as u64, 0)?;
                    n += write_all(writer, &[field.descending as u8])?;
                    n += field.ty.encode(writer)?;
                }
            }
            Type::Nullable(inner) => {
                n += inner.encode(writer)?;
            }
            Type::OneOf(oneof) => {
                n += write_all(writer, &[oneof.index_bytes.bytes() as u8])?;
                n += encode_uint(writer, oneof.elements.len() as u64, 0)?;
                for element in &oneof.elements {
                    n += element.encode(writer)?;
                }
            }
            Type::Named(named) => {
                n += encode_len_prefixed(writer, named.name.as_bytes(), 0)?;
                n += named.inner.encode(writer)?;
            }
            _ => {}
        }
        Ok(n)
    }

    /// Reads a descriptor back from its canonical wire form
    pub fn decode(reader: &mut dyn Read) -> Result<(Type, usize), Error> {
        Self::decode_at_depth(reader, 0)
    }

    fn decode_at_depth(reader: &mut dyn Read, depth: usize) -> Result<(Type, usize), Error> {
        if depth > MAX_TYPE_DEPTH {
            return Err(Error::decoding("descriptor nesting too deep"));
        }
        let kind = Kind::try_from(reader.next()?)?;
        let mut n = 1;

        let ty = match kind {
            Kind::Undefined => Type::Undefined,
            Kind::Boolean => Type::Boolean,
            Kind::Int => Type::Int,
            Kind::Int8 => Type::Int8,
            Kind::Int16 => Type::Int16,
            Kind::Int32 => Type::Int32,
            Kind::Int64 => Type::Int64,
            Kind::Uint => Type::Uint,
            Kind::Uint8 => Type::Uint8,
            Kind::Uint16 => Type::Uint16,
            Kind::Uint32 => Type::Uint32,
            Kind::Uint64 => Type::Uint64,
            Kind::Float32 => Type::Float32,
            Kind::Float64 => Type::Float64,
            Kind::String => Type::String,
            Kind::Bytes => {
                let (fixed_size, size_n) = decode_uint(reader, 0)?;
                n += size_n;
                Type::Bytes {
                    fixed_size: usize::try_from(fixed_size)
                        .map_err(|_| Error::decoding("fixed size overflows"))?,
                }
            }
            Kind::Duration => Type::Duration,
            Kind::Timestamp => Type::Timestamp,
            Kind::DateTime => {
                let flag = reader.next()?;
                n += 1;
                let fixed_zone = match flag {
                    0x00 => None,
                    0x01 => {
                        let (zone, zone_n) = decode_len_prefixed(reader, 0)?;
                        n += zone_n;
                        Some(
                            String::from_utf8(zone)
                                .map_err(|_| Error::decoding("zone identity is not valid UTF-8"))?,
                        )
                    }
                    _ => {
                        return Err(
                            Error::decoding("invalid fixed-zone flag").with_detail("byte", flag)
                        )
                    }
                };
                Type::DateTime { fixed_zone }
            }
            Kind::Enum => {
                let width = IndexWidth::from_byte(reader.next()?)?;
                n += 1;
                let (count, count_n) = decode_uint(reader, 0)?;
                n += count_n;
                let mut elements = Vec::with_capacity((count as usize).min(256));
                for _ in 0..count {
                    let (name, name_n) = decode_len_prefixed(reader, 0)?;
                    n += name_n;
                    let (value, value_n) = decode_uint(reader, 0)?;
                    n += value_n;
                    elements.push(EnumElement::new(
                        String::from_utf8(name)
                            .map_err(|_| Error::decoding("element name is not valid UTF-8"))?,
                        value,
                    ));
                }
                Type::Enum(EnumType::new(width, elements))
            }
            Kind::Array => {
                let (fixed_size, size_n) = decode_uint(reader, 0)?;
                n += size_n;
                let (elem, elem_n) = Self::decode_at_depth(reader, depth + 1)?;
                n += elem_n;
                Type::Array(ArrayType {
                    elem: Box::new(elem),
                    fixed_size: usize::try_from(fixed_size)
                        .map_err(|_| Error::decoding("fixed size overflows"))?,
                })
            }
            Kind::Map => {
                let flags = reader.next()?;
                n += 1;
                let (key, key_n) = Self::decode_at_depth(reader, depth + 1)?;
                n += key_n;
                let (value, value_n) = Self::decode_at_depth(reader, depth + 1)?;
                n += value_n;
                Type::Map(
                    MapType::new(key, value)
                        .with_descending_keys(flags & 0x01 != 0)
                        .with_descending_values(flags & 0x02 != 0),
                )
            }
            Kind::Struct => {
                let (count, count_n) = decode_uint(reader, 0)?;
                n += count_n;
                let mut fields = Vec::with_capacity((count as usize).min(256));
                for _ in 0..count {
                    let (name, name_n) = decode_len_prefixed(reader, 0)?;
                    n += name_n;
                    let (ordinal, ordinal_n) = decode_uint(reader, 0)?;
                    n += ordinal_n;
                    let flags = reader.next()?;
                    n += 1;
                    let (ty, ty_n) = Self::decode_at_depth(reader, depth + 1)?;
                    n += ty_n;
                    let field = Field::new(
                        String::from_utf8(name)
                            .map_err(|_| Error::decoding("field name is not valid UTF-8"))?,
                        ty,
                    )
                    .with_ordinal(
                        u32::try_from(ordinal)
                            .map_err(|_| Error::decoding("field ordinal overflows"))?,
                    )
                    .with_descending(flags & 0x01 != 0);
                    fields.push(field);
                }
                // Ordinals come off the wire; no positional assignment.
                Type::Struct(StructType { fields })
            }
            Kind::Nullable => {
                let (inner, inner_n) = Self::decode_at_depth(reader, depth + 1)?;
                n += inner_n;
                Type::Nullable(Box::new(inner))
            }
            Kind::OneOf => {
                let width = IndexWidth::from_byte(reader.next()?)?;
                n += 1;
                let (count, count_n) = decode_uint(reader, 0)?;
                n += count_n;
                let mut elements = Vec::with_capacity((count as usize).min(256));
                for _ in 0..count {
                    let (element, element_n) = Self::decode_at_depth(reader, depth + 1)?;
                    n += element_n;
                    elements.push(element);
                }
                Type::OneOf(OneOfType::new(width, elements))
            }
            Kind::Named => {
                let (name, name_n) = decode_len_prefixed(reader, 0)?;
                n += name_n;
                let (inner, inner_n) = Self::decode_at_depth(reader, depth + 1)?;
                n += inner_n;
                Type::Named(NamedType {
                    name: String::from_utf8(name)
                        .map_err(|_| Error::decoding("type name is not valid UTF-8"))?,
                    inner: Box::new(inner),
                })
            }
            Kind::Any => Type::Any,
        };
        Ok((ty, n))
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bytes { fixed_size } if *fixed_size > 0 => {
                write!(f, "bytes[{}]", fixed_size)
            }
            Type::DateTime {
                fixed_zone: Some(zone),
            } => write!(f, "datetime<{}>", zone),
            Type::Enum(en) => {
                write!(f, "enum{{")?;
                for (i, e) in en.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", e.name, e.value)?;
                }
                write!(f, "}}")
            }
            Type::Array(at) if at.fixed_size > 0 => {
                write!(f, "array[{}]<{}>", at.fixed_size, at.elem)
            }
            Type::Array(at) => write!(f, "array<{}>", at.elem),
            Type::Map(mt) => write!(f, "map<{},{}>", mt.key, mt.value),
            Type::Struct(st) => {
                write!(f, "struct{{")?;
                for (i, field) in st.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            Type::Nullable(inner) => write!(f, "nullable<{}>", inner),
            Type::OneOf(oneof) => {
                write!(f, "oneof<")?;
                for (i, element) in oneof.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ">")
            }
            Type::Named(named) => write!(f, "{}({})", named.name, named.inner),
            other => {
                let kind = other.kind();
                write!(f, "{}", format!("{:?}", kind).to_lowercase())
            }
        }
    }
}
