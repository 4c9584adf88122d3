//! Error types for manifest access.

use crate::fields::ValueKind;

/// Errors that can occur when reading, writing or loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Two mutually exclusive keys are present in the same document.
    #[error("only one of '{first}' and '{second}' may be present in a manifest")]
    ConflictingKeys {
        /// The key that takes priority.
        first: String,
        /// The key that conflicts with it.
        second: String,
    },

    /// A required field with no default is absent.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field is present but holds a value of the wrong shape.
    #[error("field '{field}' must be {expected}, found {found}")]
    TypeMismatch {
        /// The field key, or an indexed path such as `modules[2]`.
        field: String,
        /// The kind the accessor requires.
        expected: ValueKind,
        /// The kind actually stored.
        found: ValueKind,
    },

    /// A module position lies outside the module list.
    #[error("module position {position} is out of range for {len} modules")]
    PositionOutOfRange {
        /// The requested position.
        position: usize,
        /// The length of the module list.
        len: usize,
    },

    /// An I/O error occurred while reading or writing a manifest file.
    #[error("failed to read manifest: {0}")]
    IoError(#[from] std::io::Error),

    /// The manifest text could not be parsed.
    #[error("failed to parse manifest: {0}")]
    ParseError(String),

    /// The manifest could not be serialized.
    #[error("failed to serialize manifest: {0}")]
    SerializeError(String),
}

impl ManifestError {
    pub(crate) fn type_mismatch(
        field: impl Into<String>,
        expected: ValueKind,
        found: &serde_json::Value,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            found: ValueKind::of(found),
        }
    }

    /// Returns `true` if a required field was absent.
    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField(_))
    }

    /// Returns `true` if a field held a value of the wrong type.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}
