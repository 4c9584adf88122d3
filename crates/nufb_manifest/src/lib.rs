//! Typed accessors over flatpak-builder manifest documents.
//!
//! A manifest is parsed into an untyped, ordered JSON mapping which remains the
//! single source of truth. [`Manifest`] and [`Module`] wrap that mapping and
//! expose typed fields (application id, branch, module name, sources) without
//! copying it, so serializing the raw document after a wrapper mutation
//! reflects the mutation.

#![warn(missing_docs)]

pub mod error;
pub mod fields;
pub mod keys;
pub mod loader;
pub mod manifest;
pub mod module;

pub use error::ManifestError;
pub use fields::{RawMap, ValueKind};
pub use loader::{load_manifest, load_manifest_from_str, manifest_to_string, save_manifest};
pub use manifest::Manifest;
pub use module::{Module, ModuleRef, ModuleView};
