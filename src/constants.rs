//! Global constants used throughout the Cartwheel codebase.
//!
//! Defaults that several modules share live here rather than being scattered
//! as magic numbers. Anything the user can override sits in
//! [`crate::config::Settings`]; these are only the compiled-in fallbacks.

/// Default recursion depth when scanning a directory tree for manifests.
///
/// Dropping a deeply nested checkout onto the roster should not walk the
/// whole disk, so discovery stops this many levels below the starting
/// directory.
pub const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Directory under the user's home directory where Cartwheel keeps its state.
pub const STORAGE_DIR_NAME: &str = ".cartwheel";

/// File name of the persisted roster inside the storage directory.
pub const STORAGE_FILE_NAME: &str = "roster.toml";

/// File name of the optional settings file inside the storage directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Executable name of the external dependency toolkit when the settings file
/// does not name one.
pub const DEFAULT_TOOLKIT_COMMAND: &str = "carthage";

/// Environment variable overriding the settings file location.
pub const ENV_CONFIG: &str = "CARTWHEEL_CONFIG";

/// Environment variable overriding the storage directory (used heavily by
/// tests to isolate state).
pub const ENV_STORAGE_DIR: &str = "CARTWHEEL_STORAGE_DIR";

/// Environment variable disabling progress bars in the CLI.
pub const ENV_NO_PROGRESS: &str = "CARTWHEEL_NO_PROGRESS";
