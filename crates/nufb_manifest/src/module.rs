//! Typed access to a single manifest module.

use std::borrow::{Borrow, BorrowMut};
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ManifestError;
use crate::fields::{self, RawDisplay, RawMap, ValueKind};
use crate::keys::{MODULE_NAME, MODULE_SOURCES};

/// A wrapper around the raw mapping of one build module.
///
/// `D` decides who owns the mapping. [`Module`] with the default parameter
/// owns a free-standing module, e.g. one created with [`Module::new`] before
/// it is handed to [`Manifest::add_module`](crate::Manifest::add_module).
/// [`ModuleView`] and [`ModuleRef`] borrow a module stored inside a manifest,
/// so every write goes straight into the manifest's raw document.
#[derive(Debug, Clone, PartialEq)]
pub struct Module<D = RawMap> {
    data: D,
}

/// A mutable view of a module living inside a manifest.
pub type ModuleView<'a> = Module<&'a mut RawMap>;

/// A read-only view of a module living inside a manifest.
pub type ModuleRef<'a> = Module<&'a RawMap>;

impl Module {
    /// Creates a new module with the given name and no other fields.
    pub fn new(name: impl Into<String>) -> Self {
        let mut module = Self::default();
        module.set_name(name);
        module
    }

    /// Creates a new module with the given name and extra fields.
    ///
    /// A `name` entry in `fields` is overridden by `name`. Typed fields are
    /// validated as if written with [`Module::set_value`].
    pub fn with_fields(name: impl Into<String>, fields: RawMap) -> Result<Self, ManifestError> {
        let mut module = Self::new(name);
        for (key, value) in fields {
            if key == MODULE_NAME {
                continue;
            }
            module.set_value(&key, value)?;
        }
        Ok(module)
    }

    /// Consumes the module and returns its raw mapping.
    pub fn into_data(self) -> RawMap {
        self.data
    }
}

impl Default for Module {
    fn default() -> Self {
        Self {
            data: RawMap::new(),
        }
    }
}

impl From<RawMap> for Module {
    fn from(data: RawMap) -> Self {
        Self { data }
    }
}

impl<D> Module<D> {
    /// Wraps an existing raw module mapping.
    pub fn wrap(data: D) -> Self {
        Self { data }
    }
}

impl<D: Borrow<RawMap>> Module<D> {
    /// The raw mapping of this module.
    pub fn data(&self) -> &RawMap {
        Borrow::<RawMap>::borrow(&self.data)
    }

    /// The name of the module, used in e.g. build logs.
    ///
    /// # Errors
    ///
    /// [`ManifestError::MissingField`] if unset, [`ManifestError::TypeMismatch`]
    /// if it is not a string.
    pub fn name(&self) -> Result<&str, ManifestError> {
        fields::ensure_string(self.data(), MODULE_NAME, None)
    }
}

impl<D: BorrowMut<RawMap>> Module<D> {
    /// The raw mapping of this module, for fields without typed accessors.
    pub fn data_mut(&mut self) -> &mut RawMap {
        BorrowMut::<RawMap>::borrow_mut(&mut self.data)
    }

    /// Sets the name of the module.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.data_mut()
            .insert(MODULE_NAME.to_string(), Value::String(name.into()));
    }

    /// The sources that will be downloaded and extracted in order.
    ///
    /// An absent list is created empty in the raw mapping. The returned list
    /// is the stored one, so pushing to it edits the module.
    pub fn sources(&mut self) -> Result<&mut Vec<Value>, ManifestError> {
        fields::ensure_list(self.data_mut(), MODULE_SOURCES)
    }

    /// Writes a field whose type is only known at runtime.
    ///
    /// `name` must be a string and `sources` an array; other keys are stored
    /// unchecked. A rejected value leaves the module untouched.
    pub fn set_value(&mut self, key: &str, value: Value) -> Result<(), ManifestError> {
        match key {
            MODULE_NAME => {
                let name = fields::expect_string(value, key)?;
                self.set_name(name);
            }
            MODULE_SOURCES => {
                fields::expect_kind(&value, ValueKind::Array, key)?;
                self.data_mut().insert(key.to_string(), value);
            }
            _ => {
                self.data_mut().insert(key.to_string(), value);
            }
        }
        Ok(())
    }
}

impl<D: Borrow<RawMap>> fmt::Display for Module<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Module: name={}>", RawDisplay(self.data().get(MODULE_NAME)))
    }
}

impl<D: Borrow<RawMap>> Serialize for Module<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data().serialize(serializer)
    }
}
