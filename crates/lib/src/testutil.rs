//! Shared fixtures for unit tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{ProjectConfig, ProjectPaths, RunOptions};
use crate::context::{Backends, RunContext};
use crate::provenance::{ProvenanceError, Vcs};
use crate::publish::{ArtifactCoordinates, ArtifactRepository, ObjectStore, PublishError};

pub const MINIMAL_CONFIG: &str = r#"[project]
binary_name = "xl-blueprint"
artifact_name = "blueprint-cli"
package_path = "github.com/example/blueprint-cli"
main_path = "cmd/blueprint"
base_version = "25.1.0"
group = "com.example.cli"
"#;

pub fn minimal_config() -> ProjectConfig {
  ProjectConfig::parse(MINIMAL_CONFIG).unwrap()
}

/// A run context rooted at `root` with in-memory backends.
pub fn run_context(root: &Path, config: ProjectConfig, options: RunOptions) -> RunContext {
  let paths = ProjectPaths::new(root, &config);
  let backends = Backends {
    vcs: Arc::new(StaticVcs::new("0123456789abcdef", "blueprint-cli-25.1.0-2-g0123456")),
    store: Arc::new(MemoryObjectStore::default()),
    repository: Arc::new(MemoryRepository::default()),
  };
  RunContext::new(config, paths, options, backends).unwrap()
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
  use std::os::unix::fs::PermissionsExt;

  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Version control answering with fixed values.
pub struct StaticVcs {
  commit: String,
  describe: String,
}

impl StaticVcs {
  pub fn new(commit: &str, describe: &str) -> Self {
    Self {
      commit: commit.to_string(),
      describe: describe.to_string(),
    }
  }
}

#[async_trait]
impl Vcs for StaticVcs {
  async fn head_commit(&self, _root: &Path) -> Result<String, ProvenanceError> {
    Ok(self.commit.clone())
  }

  async fn describe(&self, _root: &Path) -> Result<String, ProvenanceError> {
    Ok(self.describe.clone())
  }
}

#[derive(Default)]
pub struct MemoryObjectStore {
  objects: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryObjectStore {
  /// Stored `<bucket>/<key>` entries, in upload order.
  pub fn keys(&self) -> Vec<String> {
    self.objects.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
  }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
  fn describe(&self, bucket: &str) -> String {
    format!("memory:{bucket}")
  }

  async fn put(&self, bucket: &str, key: &str, file: &Path) -> Result<(), PublishError> {
    let bytes = std::fs::read(file)?;
    self.objects.lock().unwrap().push((format!("{bucket}/{key}"), bytes));
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryRepository {
  deployed: Mutex<Vec<(String, ArtifactCoordinates)>>,
  fail: bool,
}

impl MemoryRepository {
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn deployed(&self) -> Vec<(String, ArtifactCoordinates)> {
    self.deployed.lock().unwrap().clone()
  }
}

#[async_trait]
impl ArtifactRepository for MemoryRepository {
  fn describe(&self, repository: &str) -> String {
    format!("memory:{repository}")
  }

  async fn deploy(&self, repository: &str, coordinates: &ArtifactCoordinates, _file: &Path) -> Result<(), PublishError> {
    if self.fail {
      return Err(PublishError::Status {
        url: format!("memory:{repository}"),
        status: 401,
      });
    }
    self
      .deployed
      .lock()
      .unwrap()
      .push((repository.to_string(), coordinates.clone()));
    Ok(())
  }
}
