//! Custom error

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::kind::Kind;

/// The closed set of failure categories reported by the codec.
///
/// The identifiers are stable: they are part of the contract with the
/// orchestration layers driving nested encoding and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An operation was attempted on the `Undefined` type
    UndefinedType,

    /// The byte stream does not parse as a value of the declared type
    DecodingBinaryValue,

    /// A value could not be formatted onto the wire
    EncodingBinaryValue,

    /// The caller supplied a value that violates its own invariants
    InvalidValue,

    /// The caller supplied a malformed type descriptor
    InvalidType,

    /// A value does not structurally match the declared type
    MismatchingValueType,

    /// A decoded index or constant is not declared by the type
    TypeConstraintViolation,

    /// A fixed-size composite holds the wrong number of values
    MissingFixedSizeValues,

    /// The underlying writer failed
    WritingFailed,

    /// A one-shot write surface was driven twice
    AlreadyWritten,

    /// A one-shot read surface was driven past its end
    AlreadyRead,

    /// A read surface was queried before it produced anything
    NotReadYet,
}

impl ErrorKind {
    /// Stable identifier of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UndefinedType => "UndefinedType",
            ErrorKind::DecodingBinaryValue => "DecodingBinaryValue",
            ErrorKind::EncodingBinaryValue => "EncodingBinaryValue",
            ErrorKind::InvalidValue => "InvalidValue",
            ErrorKind::InvalidType => "InvalidType",
            ErrorKind::MismatchingValueType => "MismatchingValueType",
            ErrorKind::TypeConstraintViolation => "TypeConstraintViolation",
            ErrorKind::MissingFixedSizeValues => "MissingFixedSizeValues",
            ErrorKind::WritingFailed => "WritingFailed",
            ErrorKind::AlreadyWritten => "AlreadyWritten",
            ErrorKind::AlreadyRead => "AlreadyRead",
            ErrorKind::NotReadYet => "NotReadYet",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codec error: an [`ErrorKind`] paired with a message and a key-value
/// detail map.
///
/// Errors are returned, never thrown; codec calls never retry internally.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}{}", fmt_details(.details))]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    details: BTreeMap<&'static str, String>,
    #[source]
    source: Option<std::io::Error>,
}

fn fmt_details(details: &BTreeMap<&'static str, String>) -> String {
    if details.is_empty() {
        return String::new();
    }
    let body = details
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ({})", body)
}

impl Error {
    /// Creates a new error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: BTreeMap::new(),
            source: None,
        }
    }

    /// Attaches a key-value detail to the error
    pub fn with_detail(mut self, key: &'static str, value: impl ToString) -> Self {
        self.details.insert(key, value.to_string());
        self
    }

    /// The failure category
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The key-value details attached so far
    pub fn details(&self) -> &BTreeMap<&'static str, String> {
        &self.details
    }

    pub(crate) fn undefined(operation: &'static str) -> Self {
        Self::new(ErrorKind::UndefinedType, "operation on the undefined type")
            .with_detail("operation", operation)
    }

    pub(crate) fn decoding(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::DecodingBinaryValue, message)
    }

    pub(crate) fn encoding(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::EncodingBinaryValue, message)
    }

    pub(crate) fn invalid_value(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidValue, message)
    }

    pub(crate) fn invalid_type(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidType, message)
    }

    pub(crate) fn mismatching(expected: Kind, found: Kind) -> Self {
        Self::new(ErrorKind::MismatchingValueType, "value does not match the declared type")
            .with_detail("expected", expected)
            .with_detail("found", found)
    }

    pub(crate) fn constraint(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::TypeConstraintViolation, message)
    }

    pub(crate) fn missing_fixed_size(expected: usize, found: usize) -> Self {
        Self::new(
            ErrorKind::MissingFixedSizeValues,
            "value length disagrees with the fixed-size descriptor",
        )
        .with_detail("expected", expected)
        .with_detail("found", found)
    }

    /// A read from the underlying transport failed
    pub(crate) fn reading(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::DecodingBinaryValue,
            message: "reading from the underlying stream failed".into(),
            details: BTreeMap::new(),
            source: Some(err),
        }
    }

    /// A write to the underlying transport failed
    pub(crate) fn writing(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::WritingFailed,
            message: "writing to the underlying stream failed".into(),
            details: BTreeMap::new(),
            source: Some(err),
        }
    }

    pub(crate) fn eof() -> Self {
        Self::decoding("unexpected end of stream")
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn test_display_with_details() {
        let err = Error::new(ErrorKind::TypeConstraintViolation, "index not declared")
            .with_detail("index", 7)
            .with_detail("declared", 3);
        let rendered = err.to_string();
        assert_eq!(
            rendered,
            "TypeConstraintViolation: index not declared (declared=3, index=7)"
        );
    }

    #[test]
    fn test_display_without_details() {
        let err = Error::eof();
        assert_eq!(err.to_string(), "DecodingBinaryValue: unexpected end of stream");
    }

    #[test]
    fn test_io_source_is_preserved() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = Error::writing(io_err);
        assert_eq!(err.kind(), ErrorKind::WritingFailed);
        assert!(std::error::Error::source(&err).is_some());
    }
}
