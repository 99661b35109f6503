//! Fixed names shared across the crate.

pub const APP_NAME: &str = "shipwright";

/// Default project file name looked up in the working directory.
pub const CONFIG_FILE: &str = "shipwright.toml";

/// Environment variable carrying an explicit release version.
pub const VERSION_OVERRIDE_ENV: &str = "RELEASE_EXPLICIT";

pub const TOOLCHAIN_DIR: &str = "toolchain";
pub const VERSION_DUMP_FILE: &str = "version.dump";
pub const LOCAL_REPOSITORY_DIR: &str = ".m2/repository";

/// Key prefix for binaries uploaded to object storage.
pub const OBJECT_KEY_PREFIX: &str = "bin";
