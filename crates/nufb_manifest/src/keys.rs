//! Keys recognized in flatpak-builder manifests (see `man flatpak-manifest`).

/// A string defining the application id.
pub const MANIFEST_ID: &str = "id";

/// Legacy alias of [`MANIFEST_ID`].
pub const MANIFEST_APP_ID: &str = "app-id";

/// Keys that may hold the application id, in read priority order.
///
/// The first entry is the canonical key used for writes.
pub const MANIFEST_ID_KEYS: [&str; 2] = [MANIFEST_ID, MANIFEST_APP_ID];

/// The branch of the application.
pub const MANIFEST_BRANCH: &str = "branch";

/// The value of [`MANIFEST_BRANCH`] when the key is absent.
pub const MANIFEST_BRANCH_DEFAULT: &str = "master";

/// An array of objects specifying the modules to be built in order.
pub const MANIFEST_MODULES: &str = "modules";

/// The name of the module, used in e.g. build logs.
pub const MODULE_NAME: &str = "name";

/// An array of objects defining sources that will be downloaded and extracted.
pub const MODULE_SOURCES: &str = "sources";

/// An array of commands to run during build.
pub const MODULE_BUILD_COMMANDS: &str = "build-commands";

/// An array of shell commands that are run after the install phase.
pub const MODULE_POST_INSTALL: &str = "post-install";

/// The name of the custom module run before all others.
pub const INIT_MODULE_NAME: &str = "init";

/// The name of the custom module run after all others.
pub const FINISH_MODULE_NAME: &str = "finish";
