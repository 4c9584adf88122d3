//! Typed access to a whole manifest document.
//!
//! # Consistency model
//!
//! [`Manifest`] owns the raw mapping, which stays the single source of truth.
//! Module wrappers are borrowed views into the raw `modules` list, so the
//! wrapper sequence and the raw sequence can never diverge.
//!
//! Only the resolved application id is memoized; [`Manifest::set_id`] refreshes
//! it. If the id keys are changed through [`Manifest::data_mut`] after the id
//! was read, the cached id is stale.
//!
//! The `init` and `finish` modules are not memoized. Every call to
//! [`Manifest::init_module`] or [`Manifest::finish_module`] scans the module
//! list again, so edits made through [`Manifest::raw_modules`] or
//! [`Manifest::data_mut`] are always seen. If such an edit removes the
//! module, the next call creates a new one.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::ManifestError;
use crate::fields::{self, RawDisplay, RawMap, ValueKind};
use crate::keys::{
    FINISH_MODULE_NAME, INIT_MODULE_NAME, MANIFEST_APP_ID, MANIFEST_BRANCH,
    MANIFEST_BRANCH_DEFAULT, MANIFEST_ID, MANIFEST_ID_KEYS, MANIFEST_MODULES,
};
use crate::module::{Module, ModuleRef, ModuleView};

/// The bookkeeping modules a manifest creates on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialModule {
    Init,
    Finish,
}

impl SpecialModule {
    fn name(self) -> &'static str {
        match self {
            Self::Init => INIT_MODULE_NAME,
            Self::Finish => FINISH_MODULE_NAME,
        }
    }

    /// Where a missing module is inserted; `None` appends.
    fn insert_position(self) -> Option<usize> {
        match self {
            Self::Init => Some(0),
            Self::Finish => None,
        }
    }
}

/// A typed wrapper around a raw manifest mapping.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    data: RawMap,
    id: Option<String>,
}

impl Manifest {
    /// Creates a manifest around an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing raw manifest mapping.
    ///
    /// # Errors
    ///
    /// [`ManifestError::ConflictingKeys`] if both `id` and `app-id` are present.
    /// No other field is validated until it is accessed.
    pub fn from_data(data: RawMap) -> Result<Self, ManifestError> {
        if data.contains_key(MANIFEST_ID) && data.contains_key(MANIFEST_APP_ID) {
            return Err(ManifestError::ConflictingKeys {
                first: MANIFEST_ID.to_string(),
                second: MANIFEST_APP_ID.to_string(),
            });
        }
        Ok(Self {
            data,
            ..Self::default()
        })
    }

    /// The raw manifest mapping.
    pub fn data(&self) -> &RawMap {
        &self.data
    }

    /// Mutable access to the raw manifest mapping.
    ///
    /// Changes to the id keys made here are not seen by the memoized id (see
    /// the module documentation).
    pub fn data_mut(&mut self) -> &mut RawMap {
        &mut self.data
    }

    /// Consumes the wrapper and returns the raw mapping.
    pub fn into_data(self) -> RawMap {
        self.data
    }

    /// The application id.
    ///
    /// Read from `id`, or from the legacy `app-id` key if `id` does not hold a
    /// string. The first successful read is cached.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::TypeMismatch`] if no key holds a string and one of
    ///   them holds something else; the error names the highest-priority
    ///   offending key.
    /// - [`ManifestError::MissingField`] if neither key is present.
    pub fn id(&mut self) -> Result<&str, ManifestError> {
        let id = match self.id.take() {
            Some(id) => id,
            None => self.resolve_id()?,
        };
        Ok(self.id.insert(id).as_str())
    }

    fn resolve_id(&self) -> Result<String, ManifestError> {
        let mut first_error = None;
        for key in MANIFEST_ID_KEYS {
            match fields::ensure_string(&self.data, key, None) {
                Ok(id) => return Ok(id.to_string()),
                Err(err) if err.is_type_mismatch() => {
                    first_error.get_or_insert(err);
                }
                Err(_) => {}
            }
        }
        Err(first_error.unwrap_or_else(|| ManifestError::MissingField(MANIFEST_ID.to_string())))
    }

    /// Sets the application id.
    ///
    /// The value is stored under `id`; any legacy `app-id` entry is removed so
    /// the two keys never coexist.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.data
            .insert(MANIFEST_ID.to_string(), Value::String(id.clone()));
        for key in &MANIFEST_ID_KEYS[1..] {
            self.data.shift_remove(*key);
        }
        self.id = Some(id);
    }

    /// The branch of the application, `master` if unset.
    pub fn branch(&self) -> Result<&str, ManifestError> {
        fields::ensure_string(&self.data, MANIFEST_BRANCH, Some(MANIFEST_BRANCH_DEFAULT))
    }

    /// Sets the branch of the application.
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.data
            .insert(MANIFEST_BRANCH.to_string(), Value::String(branch.into()));
    }

    /// The raw module list, created empty in the document if absent.
    ///
    /// This is the stored list; inserting or removing entries here is seen by
    /// every later module accessor, including [`Manifest::init_module`].
    ///
    /// # Errors
    ///
    /// [`ManifestError::TypeMismatch`] if `modules` is not an array.
    pub fn raw_modules(&mut self) -> Result<&mut Vec<Value>, ManifestError> {
        fields::ensure_list(&mut self.data, MANIFEST_MODULES)
    }

    /// Views of all modules, in manifest order.
    ///
    /// # Errors
    ///
    /// [`ManifestError::TypeMismatch`] if `modules` is not an array or one of
    /// its entries is not an object.
    pub fn modules(&mut self) -> Result<Vec<ModuleView<'_>>, ManifestError> {
        self.raw_modules()?
            .iter_mut()
            .enumerate()
            .map(|(index, item)| module_view(index, item))
            .collect()
    }

    /// A view of the module at `index`.
    pub fn module(&mut self, index: usize) -> Result<ModuleView<'_>, ManifestError> {
        let raw = self.raw_modules()?;
        let len = raw.len();
        match raw.get_mut(index) {
            Some(item) => module_view(index, item),
            None => Err(ManifestError::PositionOutOfRange {
                position: index,
                len,
            }),
        }
    }

    /// Inserts `module` at `position`, or appends it if `position` is `None`.
    ///
    /// Returns the index the module ended up at.
    ///
    /// # Errors
    ///
    /// [`ManifestError::PositionOutOfRange`] if `position` is past the end.
    pub fn add_module(
        &mut self,
        module: Module,
        position: Option<usize>,
    ) -> Result<usize, ManifestError> {
        let raw = self.raw_modules()?;
        let len = raw.len();
        let index = match position {
            None => len,
            Some(position) if position <= len => position,
            Some(position) => return Err(ManifestError::PositionOutOfRange { position, len }),
        };
        raw.insert(index, Value::Object(module.into_data()));
        Ok(index)
    }

    /// Removes and returns the module at `index`.
    pub fn remove_module(&mut self, index: usize) -> Result<Module, ManifestError> {
        let raw = self.raw_modules()?;
        let len = raw.len();
        if index >= len {
            return Err(ManifestError::PositionOutOfRange {
                position: index,
                len,
            });
        }
        let data = match raw.remove(index) {
            Value::Object(data) => data,
            other => {
                let err = ManifestError::type_mismatch(
                    format!("{MANIFEST_MODULES}[{index}]"),
                    ValueKind::Object,
                    &other,
                );
                raw.insert(index, other);
                return Err(err);
            }
        };
        Ok(Module::from(data))
    }

    /// Finds the first module named `name`.
    ///
    /// Modules whose name is missing or not a string, and entries that are not
    /// objects, are skipped rather than reported.
    pub fn find_module(&mut self, name: &str) -> Result<Option<ModuleView<'_>>, ManifestError> {
        match self.position_of(name)? {
            Some(index) => self.module(index).map(Some),
            None => Ok(None),
        }
    }

    fn position_of(&mut self, name: &str) -> Result<Option<usize>, ManifestError> {
        let raw = self.raw_modules()?;
        Ok(raw.iter().position(|item| match item {
            Value::Object(data) => ModuleRef::wrap(data).name().is_ok_and(|found| found == name),
            _ => false,
        }))
    }

    /// The custom module run before all others.
    ///
    /// The first module named `init`; if there is none, a new one is inserted
    /// at the start.
    pub fn init_module(&mut self) -> Result<ModuleView<'_>, ManifestError> {
        self.special_module(SpecialModule::Init)
    }

    /// The custom module run after all others.
    ///
    /// The first module named `finish`; if there is none, a new one is
    /// appended.
    pub fn finish_module(&mut self) -> Result<ModuleView<'_>, ManifestError> {
        self.special_module(SpecialModule::Finish)
    }

    fn special_module(&mut self, which: SpecialModule) -> Result<ModuleView<'_>, ManifestError> {
        let index = match self.position_of(which.name())? {
            Some(index) => index,
            None => {
                debug!(module = which.name(), "creating bookkeeping module");
                self.add_module(Module::new(which.name()), which.insert_position())?
            }
        };
        self.module(index)
    }
}

fn module_view(index: usize, item: &mut Value) -> Result<ModuleView<'_>, ManifestError> {
    match item {
        Value::Object(data) => Ok(ModuleView::wrap(data)),
        other => Err(ManifestError::type_mismatch(
            format!("{MANIFEST_MODULES}[{index}]"),
            ValueKind::Object,
            other,
        )),
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .data
            .get(MANIFEST_ID)
            .or_else(|| self.data.get(MANIFEST_APP_ID));
        write!(f, "<Manifest: id={}, branch=", RawDisplay(id))?;
        match self.data.get(MANIFEST_BRANCH) {
            Some(branch) => write!(f, "{}>", RawDisplay(Some(branch))),
            None => write!(f, "{MANIFEST_BRANCH_DEFAULT}>"),
        }
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        match value {
            Value::Object(data) => Manifest::from_data(data).unwrap(),
            _ => panic!("expected an object"),
        }
    }

    fn names(manifest: &Manifest) -> Vec<Value> {
        manifest.data()["modules"]
            .as_array()
            .unwrap()
            .iter()
            .map(|module| module["name"].clone())
            .collect()
    }

    #[test]
    fn empty_manifest() {
        let mut manifest = Manifest::new();
        assert!(manifest.data().is_empty());
        assert!(manifest.id().unwrap_err().is_missing_field());
        assert_eq!(manifest.branch().unwrap(), "master");
    }

    #[test]
    fn conflicting_id_keys() {
        let mut data = RawMap::new();
        data.insert("id".into(), json!("a"));
        data.insert("app-id".into(), json!("b"));
        let err = Manifest::from_data(data).unwrap_err();
        assert!(matches!(err, ManifestError::ConflictingKeys { .. }));
    }

    #[test]
    fn construction_ignores_invalid_fields() {
        let mut manifest = manifest(json!({ "id": 1, "modules": "nope", "branch": [] }));
        assert!(manifest.id().unwrap_err().is_type_mismatch());
        assert!(manifest.modules().unwrap_err().is_type_mismatch());
        assert!(manifest.branch().unwrap_err().is_type_mismatch());
    }

    #[test]
    fn id_from_primary_key() {
        let mut manifest = manifest(json!({ "id": "org.example.App" }));
        assert_eq!(manifest.id().unwrap(), "org.example.App");
    }

    #[test]
    fn id_from_legacy_key() {
        let mut manifest = manifest(json!({ "app-id": "org.example.Legacy" }));
        assert_eq!(manifest.id().unwrap(), "org.example.Legacy");
    }

    #[test]
    fn id_type_error_names_primary_key() {
        let mut manifest = manifest(json!({ "id": 42 }));
        let err = manifest.id().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::TypeMismatch { ref field, found: ValueKind::Number, .. } if field == "id"
        ));
    }

    #[test]
    fn id_primary_error_wins_over_legacy_error() {
        let mut manifest = Manifest::new();
        manifest.data_mut().insert("id".into(), json!(1));
        manifest.data_mut().insert("app-id".into(), json!(false));
        let err = manifest.id().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::TypeMismatch { ref field, .. } if field == "id"
        ));
    }

    #[test]
    fn id_legacy_type_error() {
        let mut manifest = manifest(json!({ "app-id": ["x"] }));
        let err = manifest.id().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::TypeMismatch { ref field, .. } if field == "app-id"
        ));
    }

    #[test]
    fn id_is_cached() {
        let mut manifest = manifest(json!({ "id": "org.example.App" }));
        assert_eq!(manifest.id().unwrap(), "org.example.App");
        manifest.data_mut().insert("id".into(), json!("org.example.Changed"));
        assert_eq!(manifest.id().unwrap(), "org.example.App");
    }

    #[test]
    fn set_id_replaces_legacy_key() {
        let mut manifest = manifest(json!({ "app-id": "org.example.Old", "branch": "stable" }));
        manifest.set_id("x");
        assert!(!manifest.data().contains_key("app-id"));
        assert_eq!(manifest.data()["id"], json!("x"));

        manifest.data_mut().insert("id".into(), json!("y"));
        assert_eq!(manifest.id().unwrap(), "x");
    }

    #[test]
    fn branch_read_write() {
        let mut manifest = manifest(json!({ "id": "org.example.App" }));
        assert_eq!(manifest.branch().unwrap(), "master");
        assert!(!manifest.data().contains_key("branch"));
        manifest.set_branch("stable");
        assert_eq!(manifest.branch().unwrap(), "stable");
        manifest.data_mut().insert("branch".into(), json!("beta"));
        assert_eq!(manifest.branch().unwrap(), "beta");
    }

    #[test]
    fn modules_materialized() {
        let mut manifest = Manifest::new();
        assert!(manifest.modules().unwrap().is_empty());
        assert_eq!(manifest.data()["modules"], json!([]));
    }

    #[test]
    fn modules_entry_not_an_object() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }, "b"] }));
        let err = manifest.modules().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::TypeMismatch { ref field, .. } if field == "modules[1]"
        ));
    }

    #[test]
    fn raw_modules_identity() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }] }));
        let first = manifest.raw_modules().unwrap() as *const Vec<Value>;
        let second = manifest.raw_modules().unwrap() as *const Vec<Value>;
        assert_eq!(first, second);
        assert_eq!(
            first,
            manifest.data()["modules"].as_array().unwrap() as *const Vec<Value>
        );
    }

    #[test]
    fn add_module_at_position() {
        let mut manifest = manifest(json!({
            "modules": [{ "name": "a" }, { "name": "b" }, { "name": "c" }]
        }));
        let index = manifest.add_module(Module::new("x"), Some(1)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(names(&manifest), vec![json!("a"), json!("x"), json!("b"), json!("c")]);

        let views: Vec<String> = manifest
            .modules()
            .unwrap()
            .iter()
            .map(|m| m.name().unwrap().to_string())
            .collect();
        assert_eq!(views, ["a", "x", "b", "c"]);
    }

    #[test]
    fn add_module_append() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }] }));
        assert_eq!(manifest.add_module(Module::new("z"), None).unwrap(), 1);
        assert_eq!(manifest.add_module(Module::new("y"), Some(2)).unwrap(), 2);
        assert_eq!(names(&manifest), vec![json!("a"), json!("z"), json!("y")]);
    }

    #[test]
    fn add_module_out_of_range() {
        let mut manifest = Manifest::new();
        let err = manifest.add_module(Module::new("a"), Some(1)).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::PositionOutOfRange { position: 1, len: 0 }
        ));
        assert_eq!(manifest.data()["modules"], json!([]));
    }

    #[test]
    fn find_module_skips_malformed() {
        let mut manifest = manifest(json!({
            "modules": [
                { "sources": [] },
                { "name": 7 },
                "not a module",
                { "name": "lib", "buildsystem": "meson" },
                { "name": "lib" }
            ]
        }));
        let found = manifest.find_module("lib").unwrap().unwrap();
        assert_eq!(found.data()["buildsystem"], json!("meson"));
        assert!(manifest.find_module("missing").unwrap().is_none());
    }

    #[test]
    fn find_module_writes_through() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "lib" }] }));
        manifest
            .find_module("lib")
            .unwrap()
            .unwrap()
            .sources()
            .unwrap()
            .push(json!({ "type": "git", "url": "https://example.org/lib.git" }));
        assert_eq!(
            manifest.data()["modules"][0]["sources"][0]["type"],
            json!("git")
        );
    }

    #[test]
    fn init_module_created_once() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }, { "name": "b" }] }));
        manifest.init_module().unwrap().set_value("build-commands", json!(["echo init"])).unwrap();
        manifest.init_module().unwrap();

        let raw = manifest.data()["modules"].as_array().unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0], json!({ "name": "init", "build-commands": ["echo init"] }));
        assert_eq!(
            manifest.init_module().unwrap().data()["build-commands"],
            json!(["echo init"])
        );
    }

    #[test]
    fn init_module_found() {
        let mut manifest = manifest(json!({
            "modules": [{ "name": "a" }, { "name": "init", "sources": [] }, { "name": "init" }]
        }));
        assert!(manifest.init_module().unwrap().data().contains_key("sources"));
        assert_eq!(names(&manifest).len(), 3);
    }

    #[test]
    fn finish_module_appended() {
        let mut manifest = manifest(json!({
            "modules": [{ "name": "a" }, { "name": "b" }, { "name": "c" }]
        }));
        manifest.finish_module().unwrap();
        manifest.finish_module().unwrap();
        assert_eq!(
            names(&manifest),
            vec![json!("a"), json!("b"), json!("c"), json!("finish")]
        );
    }

    #[test]
    fn bookkeeping_modules_follow_insertions() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }] }));
        manifest.finish_module().unwrap();
        manifest.init_module().unwrap();
        manifest.add_module(Module::new("b"), Some(2)).unwrap();

        assert_eq!(
            names(&manifest),
            vec![json!("init"), json!("a"), json!("b"), json!("finish")]
        );
        assert_eq!(manifest.finish_module().unwrap().name().unwrap(), "finish");
        assert_eq!(manifest.init_module().unwrap().name().unwrap(), "init");
    }

    #[test]
    fn init_module_survives_raw_insert_before_it() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "init" }, { "name": "a" }] }));
        manifest.init_module().unwrap();
        manifest.raw_modules().unwrap().insert(0, json!({ "name": "x" }));

        let mut init = manifest.init_module().unwrap();
        assert_eq!(init.name().unwrap(), "init");
        init.set_value("build-commands", json!(["echo init"])).unwrap();

        assert_eq!(
            manifest.data()["modules"],
            json!([
                { "name": "x" },
                { "name": "init", "build-commands": ["echo init"] },
                { "name": "a" }
            ])
        );
    }

    #[test]
    fn finish_module_survives_raw_removal_before_it() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }, { "name": "b" }] }));
        manifest.finish_module().unwrap();
        manifest.raw_modules().unwrap().remove(0);

        manifest.finish_module().unwrap().set_name("done");
        assert_eq!(names(&manifest), vec![json!("b"), json!("done")]);
    }

    #[test]
    fn bookkeeping_modules_follow_api_removal() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }] }));
        manifest.init_module().unwrap();
        manifest.finish_module().unwrap();

        let removed = manifest.remove_module(1).unwrap();
        assert_eq!(removed.name().unwrap(), "a");
        assert_eq!(manifest.finish_module().unwrap().name().unwrap(), "finish");

        manifest.remove_module(0).unwrap();
        assert_eq!(names(&manifest), vec![json!("finish")]);
        manifest.init_module().unwrap();
        assert_eq!(names(&manifest), vec![json!("init"), json!("finish")]);
    }

    #[test]
    fn remove_module_errors() {
        let mut manifest = manifest(json!({ "modules": [1] }));
        assert!(manifest.remove_module(0).unwrap_err().is_type_mismatch());
        assert_eq!(manifest.data()["modules"], json!([1]));
        assert!(matches!(
            manifest.remove_module(3).unwrap_err(),
            ManifestError::PositionOutOfRange { position: 3, len: 1 }
        ));
    }

    #[test]
    fn init_module_recreated_after_raw_clear() {
        let mut manifest = manifest(json!({ "modules": [{ "name": "a" }] }));
        manifest.init_module().unwrap();
        manifest.data_mut().insert("modules".into(), json!([]));

        manifest.init_module().unwrap();
        manifest.init_module().unwrap();
        assert_eq!(names(&manifest), vec![json!("init")]);
    }

    #[test]
    fn display_uses_raw_values() {
        assert_eq!(
            Manifest::new().to_string(),
            "<Manifest: id=None, branch=master>"
        );
        assert_eq!(
            manifest(json!({ "app-id": "org.example.App", "branch": "stable" })).to_string(),
            "<Manifest: id=org.example.App, branch=stable>"
        );
        assert_eq!(
            manifest(json!({ "id": 5 })).to_string(),
            "<Manifest: id=5, branch=master>"
        );
        assert_eq!(
            manifest(json!({ "id": null, "branch": null })).to_string(),
            "<Manifest: id=None, branch=None>"
        );
    }

    #[test]
    fn serializes_as_raw_mapping() {
        let mut manifest = manifest(json!({ "id": "org.example.App" }));
        manifest.add_module(Module::new("lib"), None).unwrap();
        assert_eq!(
            serde_json::to_string(&manifest).unwrap(),
            r#"{"id":"org.example.App","modules":[{"name":"lib"}]}"#
        );
    }
}
