//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// A project whose toolchain download can never succeed.
pub const PROJECT_CONFIG: &str = r#"[project]
binary_name = "xl-blueprint"
artifact_name = "blueprint-cli"
package_path = "github.com/example/blueprint-cli"
main_path = "cmd/blueprint"
base_version = "25.1.0"
group = "com.example.cli"

[toolchain]
dist_url = "http://127.0.0.1:9/dl"

[publish]
local_repository = "m2"
"#;

const INHERITED_ENV: &[&str] = &[
  "RELEASE_EXPLICIT",
  "SHIPWRIGHT_USE_HOST_TOOLCHAIN",
  "SHIPWRIGHT_DEBUG",
  "SHIPWRIGHT_OPTIMIZE",
  "SHIPWRIGHT_PARALLELISM",
  "SHIPWRIGHT_REPOSITORY_USERNAME",
  "SHIPWRIGHT_REPOSITORY_PASSWORD",
  "RUST_LOG",
];

/// Isolated project directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("shipwright.toml"), PROJECT_CONFIG).unwrap();
    Self { temp }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root().join(relative)
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative: &str, content: &str) {
    let path = self.path(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// The binary, run from the project root with release inputs cleared.
  pub fn cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("shipwright");
    cmd.current_dir(self.root());
    for var in INHERITED_ENV {
      cmd.env_remove(var);
    }
    cmd
  }
}
