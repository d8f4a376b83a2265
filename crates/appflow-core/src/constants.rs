//! Constants used across the Appflow workspace.

/// The default filename for the application descriptor.
pub const DEFAULT_APPFILE: &str = "Appfile.toml";

/// The default output directory created next to the Appfile.
pub const DEFAULT_OUTPUT_DIR: &str = ".appflow";

/// Relative location of the dev-dependency fragment inside a compiled app.
pub const DEV_DEP_FRAGMENT: &str = "dev-dep/build/Vagrantfile.fragment";

/// Relative directory used for scripted dev-dependency builds.
pub const DEV_DEP_BUILD_DIR: &str = "dev-dep/build";

/// Entry script executed inside the build environment.
pub const DEV_DEP_BUILD_SCRIPT: &str = "/appflow/build.sh";

/// The single artifact name produced by a script-driver dev-dependency build.
pub const DEV_DEP_OUTPUT: &str = "dev-dep-output";

/// Registry file consulted by the file-backed infrastructure directory.
pub const DIRECTORY_FILE: &str = "directory.json";

/// Cache manifest recording the last successful dev-dependency build.
pub const DEV_DEP_MANIFEST: &str = "dev-dep.json";

/// Logical asset tree copied for every application kind.
pub const ASSET_TREE_COMMON: &str = "common";
