//! Filesystem locations used by a release run.
//!
//! Everything a run writes lives under the project root. The only path outside
//! of it is the local artifact repository, which defaults to the user's Maven
//! repository.

use std::path::{Path, PathBuf};

use crate::consts::{LOCAL_REPOSITORY_DIR, TOOLCHAIN_DIR, VERSION_DUMP_FILE};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE").map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Default location of the local artifact repository (`~/.m2/repository`)
pub fn local_repository_dir() -> Option<PathBuf> {
  home_dir().map(|home| home.join(LOCAL_REPOSITORY_DIR))
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    root.join(path)
  }
}

/// Directory used as the toolchain's workspace inside the project cache.
pub fn toolchain_dir(cache_dir: &Path) -> PathBuf {
  cache_dir.join(TOOLCHAIN_DIR)
}

/// Location of the `version=<value>` dump file.
pub fn version_dump_file(output_dir: &Path) -> PathBuf {
  output_dir.join(VERSION_DUMP_FILE)
}
