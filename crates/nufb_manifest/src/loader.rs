//! Reading and writing manifest files.

use std::path::Path;

use serde_json::Value;

use crate::error::ManifestError;
use crate::fields::ValueKind;
use crate::manifest::Manifest;

/// Loads a JSON manifest from `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    load_manifest_from_str(&content)
}

/// Parses a JSON manifest from a string.
///
/// The document root must be an object. Fields are not validated until they
/// are accessed, except that `id` and `app-id` may not both be present.
pub fn load_manifest_from_str(content: &str) -> Result<Manifest, ManifestError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ManifestError::ParseError(e.to_string()))?;
    match value {
        Value::Object(data) => Manifest::from_data(data),
        other => Err(ManifestError::ParseError(format!(
            "manifest root must be an object, found {}",
            ValueKind::of(&other)
        ))),
    }
}

/// Renders the raw manifest document as pretty-printed JSON.
pub fn manifest_to_string(manifest: &Manifest) -> Result<String, ManifestError> {
    serde_json::to_string_pretty(manifest).map_err(|e| ManifestError::SerializeError(e.to_string()))
}

/// Writes the raw manifest document to `path` as pretty-printed JSON.
pub fn save_manifest(manifest: &Manifest, path: &Path) -> Result<(), ManifestError> {
    let mut json = manifest_to_string(manifest)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}
