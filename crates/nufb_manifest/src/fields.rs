//! Field-access primitives shared by [`Manifest`](crate::Manifest) and
//! [`Module`](crate::Module).
//!
//! Every typed accessor goes through these helpers, so absent keys, defaults
//! and type mismatches are reported the same way everywhere.

use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ManifestError;

/// An untyped, ordered manifest mapping.
pub type RawMap = Map<String, Value>;

/// The shape of a raw JSON value, used in type mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// Any number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// An object.
    Object,
}

impl ValueKind {
    /// Returns the kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Null => "null",
            Self::Bool => "a boolean",
            Self::Number => "a number",
            Self::String => "a string",
            Self::Array => "an array",
            Self::Object => "an object",
        };
        f.write_str(s)
    }
}

/// Returns the list stored under `key`, creating an empty one if absent.
///
/// The returned list is the one living inside `map`, so repeated calls yield
/// the same list and mutations are visible in the raw document.
///
/// # Errors
///
/// [`ManifestError::TypeMismatch`] if the key holds anything but an array.
pub fn ensure_list<'a>(
    map: &'a mut RawMap,
    key: &str,
) -> Result<&'a mut Vec<Value>, ManifestError> {
    if !map.contains_key(key) {
        debug!(key = key, "materializing empty list");
    }
    match map.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(items) => Ok(items),
        other => Err(ManifestError::type_mismatch(key, ValueKind::Array, other)),
    }
}

/// Returns the string stored under `key`, or `default` if the key is absent.
///
/// # Errors
///
/// - [`ManifestError::TypeMismatch`] if the key holds a non-string value.
/// - [`ManifestError::MissingField`] if the key is absent and there is no default.
pub fn ensure_string<'a>(
    map: &'a RawMap,
    key: &str,
    default: Option<&'a str>,
) -> Result<&'a str, ManifestError> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ManifestError::type_mismatch(key, ValueKind::String, other)),
        None => default.ok_or_else(|| ManifestError::MissingField(key.to_string())),
    }
}

/// Checks that a value about to be written to `field` has the `expected` kind.
pub fn expect_kind(value: &Value, expected: ValueKind, field: &str) -> Result<(), ManifestError> {
    if ValueKind::of(value) == expected {
        Ok(())
    } else {
        Err(ManifestError::type_mismatch(field, expected, value))
    }
}

/// Unwraps a string value about to be written to `field`.
pub fn expect_string(value: Value, field: &str) -> Result<String, ManifestError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ManifestError::type_mismatch(field, ValueKind::String, &other)),
    }
}

/// Displays an optional raw value without validating it.
///
/// Strings are shown bare, other values as JSON, and both absence and `null`
/// as `None`.
pub(crate) struct RawDisplay<'a>(pub Option<&'a Value>);

impl fmt::Display for RawDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(Value::String(s)) => f.write_str(s),
            Some(Value::Null) | None => f.write_str("None"),
            Some(other) => write!(f, "{other}"),
        }
    }
}
