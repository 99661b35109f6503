//! Project configuration.
//!
//! A release is described by a `shipwright.toml` file at the project root.
//! Invocation-time switches (debug, optimize, host toolchain, version
//! override) are carried separately in [`RunOptions`] and never read from the
//! environment by tasks themselves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::platform::paths;

/// Errors raised while loading the project file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid config: {0}")]
  Invalid(String),
}

/// Top-level contents of `shipwright.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
  pub project: ProjectSection,
  #[serde(default)]
  pub toolchain: ToolchainSection,
  #[serde(default)]
  pub build: BuildSection,
  #[serde(default)]
  pub licenses: LicenseSection,
  #[serde(default)]
  pub publish: PublishSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
  /// Name of the compiled executable.
  pub binary_name: String,
  /// Artifact id used for publishing; also stripped from descriptive tags.
  pub artifact_name: String,
  /// Import path of the program, used to address link-time constants.
  pub package_path: String,
  /// Directory (relative to the root) holding `main.go`.
  pub main_path: String,
  /// Version the development tag is derived from.
  pub base_version: String,
  /// Artifact repository group id.
  pub group: String,
  #[serde(default = "default_prerelease_markers")]
  pub prerelease_markers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSection {
  pub version: String,
  pub dist_url: String,
  pub installer: String,
  pub cache_dir: PathBuf,
  /// Archive file name -> expected lowercase SHA-256.
  pub checksums: BTreeMap<String, String>,
  /// Tool modules installed before building.
  pub tools: Vec<String>,
}

impl Default for ToolchainSection {
  fn default() -> Self {
    Self {
      version: "1.23.3".to_string(),
      dist_url: "https://go.dev/dl".to_string(),
      installer: "golang.org/dl".to_string(),
      cache_dir: PathBuf::from(".shipwright"),
      checksums: BTreeMap::new(),
      tools: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
  pub output_dir: PathBuf,
  pub compressor: String,
  /// Schedule compression between build and publish for supported targets.
  pub compress_before_publish: bool,
}

impl Default for BuildSection {
  fn default() -> Self {
    Self {
      output_dir: PathBuf::from("build"),
      compressor: "upx".to_string(),
      compress_before_publish: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LicenseSection {
  pub manifest: PathBuf,
  pub output: PathBuf,
  pub url_scheme: String,
}

impl Default for LicenseSection {
  fn default() -> Self {
    Self {
      manifest: PathBuf::from("go.mod"),
      output: PathBuf::from("licenses/licences.md"),
      url_scheme: "http://".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSection {
  /// Defaults to the artifact name.
  pub bucket: Option<String>,
  pub object_store_url: Option<String>,
  pub repository_url: Option<String>,
  pub prerelease_repository: String,
  pub stable_repository: String,
  /// Defaults to `<output_dir>/object-store`.
  pub local_dir: Option<PathBuf>,
  /// Defaults to `~/.m2/repository`.
  pub local_repository: Option<PathBuf>,
}

impl Default for PublishSection {
  fn default() -> Self {
    Self {
      bucket: None,
      object_store_url: None,
      repository_url: None,
      prerelease_repository: "repositories/alphas".to_string(),
      stable_repository: "repositories/releases".to_string(),
      local_dir: None,
      local_repository: None,
    }
  }
}

fn default_prerelease_markers() -> Vec<String> {
  vec!["alpha".to_string()]
}

impl ProjectConfig {
  /// Load and validate a project file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    Self::parse(&content).map_err(|e| match e {
      ConfigError::Parse { source, .. } => ConfigError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })
  }

  /// Parse and validate project file contents.
  pub fn parse(content: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: PathBuf::new(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let required = [
      ("project.binary_name", &self.project.binary_name),
      ("project.artifact_name", &self.project.artifact_name),
      ("project.base_version", &self.project.base_version),
      ("toolchain.version", &self.toolchain.version),
    ];
    for (key, value) in required {
      if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{key} must not be empty")));
      }
    }
    if self.project.prerelease_markers.iter().any(|m| m.is_empty()) {
      return Err(ConfigError::Invalid(
        "project.prerelease_markers must not contain empty markers".to_string(),
      ));
    }
    Ok(())
  }

  pub fn bucket(&self) -> &str {
    self.publish.bucket.as_deref().unwrap_or(&self.project.artifact_name)
  }
}

/// Invocation-time switches for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  /// Explicit release version; empty strings are treated as absent.
  pub version_override: Option<String>,
  /// Permit a host-installed toolchain when its version matches the pin.
  pub use_host_toolchain: bool,
  /// Disable optimizations and keep symbols.
  pub debug: bool,
  /// Strip symbols from the binaries.
  pub optimize: bool,
  /// Publish to local filesystem backends instead of remote services.
  pub local_publish: bool,
  /// Maximum number of tasks running at once.
  pub parallelism: usize,
  /// Value embedded as the program's own version; defaults to the release version.
  pub cli_version: Option<String>,
  pub repository_username: Option<String>,
  pub repository_password: Option<String>,
}

/// Absolute locations derived from the project root and config.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
  pub root: PathBuf,
  pub cache_dir: PathBuf,
  pub output_dir: PathBuf,
  pub license_manifest: PathBuf,
  pub license_output: PathBuf,
  pub local_object_store: PathBuf,
  pub local_repository: Option<PathBuf>,
}

impl ProjectPaths {
  pub fn new(root: &Path, config: &ProjectConfig) -> Self {
    let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let output_dir = paths::resolve(&root, &config.build.output_dir);
    let local_object_store = config
      .publish
      .local_dir
      .as_ref()
      .map(|p| paths::resolve(&root, p))
      .unwrap_or_else(|| output_dir.join("object-store"));
    let local_repository = config
      .publish
      .local_repository
      .as_ref()
      .map(|p| paths::resolve(&root, p))
      .or_else(paths::local_repository_dir);

    Self {
      cache_dir: paths::resolve(&root, &config.toolchain.cache_dir),
      license_manifest: paths::resolve(&root, &config.licenses.manifest),
      license_output: paths::resolve(&root, &config.licenses.output),
      output_dir,
      local_object_store,
      local_repository,
      root,
    }
  }
}
