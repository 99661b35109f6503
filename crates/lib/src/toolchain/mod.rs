//! Pinned compiler toolchain bootstrap.
//!
//! The toolchain lives in a project-local cache directory which doubles as its
//! `GOPATH`:
//!
//! ```text
//! <cache>/toolchain/
//!   go.tar.gz          downloaded initial toolchain archive
//!   go/bin/go          initial toolchain
//!   bin/go1.23.3       pinned version wrapper
//!   sdk/go1.23.3/      pinned SDK (the wrapper keeps it under $HOME/sdk)
//! ```
//!
//! [`Bootstrapper::ensure`] is single-flight: concurrent callers share one
//! bootstrap, and a satisfied cache performs no network operation.

pub mod fetch;
pub mod unpack;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::exec::{self, CommandError};
use crate::platform::Platform;

/// Errors that make the toolchain unavailable.
#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("host platform is not supported")]
  UnsupportedHost,

  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  #[error("failed to unpack {archive}: {message}")]
  Unpack { archive: PathBuf, message: String },

  #[error("toolchain command failed: {0}")]
  Command(#[from] CommandError),

  #[error("installed toolchain reports {actual:?}, expected go{expected}")]
  VersionMismatch { expected: String, actual: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Where a usable toolchain came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainSource {
  /// Already present in the project cache.
  Cached,
  /// Installed into the project cache by this run.
  Installed,
  /// Host-installed toolchain matching the pin.
  Host,
}

/// A ready-to-use toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainHandle {
  /// Version tag as the toolchain reports it, e.g. `go1.23.3`.
  pub version_tag: String,
  pub executable_path: PathBuf,
  pub source: ToolchainSource,
  env: BTreeMap<String, String>,
}

impl ToolchainHandle {
  /// Environment every toolchain invocation runs with.
  pub fn env(&self) -> &BTreeMap<String, String> {
    &self.env
  }

  #[cfg(test)]
  pub(crate) fn for_tests(version_tag: &str, executable_path: &str) -> Self {
    Self {
      version_tag: version_tag.to_string(),
      executable_path: PathBuf::from(executable_path),
      source: ToolchainSource::Cached,
      env: BTreeMap::new(),
    }
  }
}

/// Settings the bootstrapper needs; derived from the project config.
#[derive(Debug, Clone)]
pub struct ToolchainSettings {
  /// Pinned version without the `go` prefix, e.g. `1.23.3`.
  pub version: String,
  pub dist_url: String,
  /// Module prefix of the version wrappers, e.g. `golang.org/dl`.
  pub installer: String,
  /// Toolchain directory inside the project cache.
  pub dir: PathBuf,
  /// Working directory for toolchain commands.
  pub workdir: PathBuf,
  pub checksums: BTreeMap<String, String>,
  pub use_host: bool,
  /// Host platform; `None` when the host is not supported.
  pub host: Option<Platform>,
  /// Name of a host-installed toolchain executable.
  pub host_executable: String,
}

/// Ensures the pinned toolchain is available, at most once per run.
pub struct Bootstrapper {
  settings: ToolchainSettings,
  handle: OnceCell<ToolchainHandle>,
  fetches: AtomicUsize,
}

impl Bootstrapper {
  pub fn new(settings: ToolchainSettings) -> Self {
    Self {
      settings,
      handle: OnceCell::new(),
      fetches: AtomicUsize::new(0),
    }
  }

  pub fn settings(&self) -> &ToolchainSettings {
    &self.settings
  }

  /// Number of archive downloads this bootstrapper performed.
  pub fn fetch_count(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }

  /// Return the pinned toolchain, bootstrapping it on first use.
  pub async fn ensure(&self) -> Result<ToolchainHandle, ToolchainError> {
    self.handle.get_or_try_init(|| self.bootstrap()).await.cloned()
  }

  async fn bootstrap(&self) -> Result<ToolchainHandle, ToolchainError> {
    let pinned = self.pinned_executable();

    if self.reports_pinned(&pinned, &self.project_env()).await {
      info!(path = ?pinned, "using cached toolchain");
      return Ok(self.project_handle(pinned, ToolchainSource::Cached));
    }

    if self.settings.use_host {
      let host = PathBuf::from(&self.settings.host_executable);
      if self.reports_pinned(&host, &BTreeMap::new()).await {
        info!(executable = %host.display(), "using host toolchain");
        return Ok(ToolchainHandle {
          version_tag: self.version_tag(),
          executable_path: host,
          source: ToolchainSource::Host,
          env: BTreeMap::new(),
        });
      }
      warn!(
        executable = %host.display(),
        expected = %self.version_tag(),
        "host toolchain missing or not at pinned version, installing into project"
      );
    }

    let platform = self.settings.host.ok_or(ToolchainError::UnsupportedHost)?;
    let initial = self.initial_executable(platform);

    if exec::succeeds(&initial, &exec::args(["version"]), &self.settings.workdir).await {
      info!(path = ?initial, "using existing initial toolchain from project");
    } else {
      info!("installing initial toolchain in project");
      self.install_initial(platform).await?;
    }

    self.install_pinned(&initial).await?;

    let env = self.project_env();
    let reported = exec::execute(&pinned, &exec::args(["version"]), &env, &self.settings.workdir).await?;
    if !reports_version(&reported, &self.settings.version) {
      return Err(ToolchainError::VersionMismatch {
        expected: self.settings.version.clone(),
        actual: reported,
      });
    }
    let goroot = exec::execute(&pinned, &exec::args(["env", "GOROOT"]), &env, &self.settings.workdir).await?;
    info!(version = %reported, goroot = %goroot, "toolchain ready");

    Ok(self.project_handle(pinned, ToolchainSource::Installed))
  }

  async fn install_initial(&self, platform: Platform) -> Result<(), ToolchainError> {
    let url = self.archive_url(platform);
    let kind = platform.os.archive_kind();
    let archive = fetch::archive_path(&self.settings.dir, kind.extension());
    let checksum = fetch::archive_file_name(&url).and_then(|name| self.settings.checksums.get(name));

    if fetch::fetch_archive(&url, &archive, checksum.map(String::as_str)).await? {
      self.fetches.fetch_add(1, Ordering::SeqCst);
    }

    unpack::unpack(&archive, &self.settings.dir, kind).await
  }

  async fn install_pinned(&self, initial: &Path) -> Result<(), ToolchainError> {
    let env = self.project_env();
    let module = format!("{}/{}@latest", self.settings.installer, self.version_tag());

    tokio::fs::create_dir_all(&self.settings.dir).await?;
    exec::execute(initial, &exec::args(["install", module.as_str()]), &env, &self.settings.workdir).await?;
    exec::execute(self.pinned_executable(), &exec::args(["download"]), &env, &self.settings.workdir).await?;
    Ok(())
  }

  async fn reports_pinned(&self, executable: &Path, env: &BTreeMap<String, String>) -> bool {
    if executable.is_absolute() && !executable.exists() {
      return false;
    }
    match exec::execute(executable, &exec::args(["version"]), env, &self.settings.workdir).await {
      Ok(output) => {
        let matches = reports_version(&output, &self.settings.version);
        debug!(executable = %executable.display(), output = %output, matches, "probed toolchain version");
        matches
      }
      Err(_) => false,
    }
  }

  fn project_handle(&self, executable_path: PathBuf, source: ToolchainSource) -> ToolchainHandle {
    ToolchainHandle {
      version_tag: self.version_tag(),
      executable_path,
      source,
      env: self.project_env(),
    }
  }

  /// `GOPATH` points at the cache; `HOME` too, so the version wrapper keeps
  /// its SDK inside the project.
  fn project_env(&self) -> BTreeMap<String, String> {
    let dir = self.settings.dir.to_string_lossy().into_owned();
    let mut env = BTreeMap::new();
    env.insert("GOPATH".to_string(), dir.clone());
    env.insert("HOME".to_string(), dir.clone());
    env.insert("USERPROFILE".to_string(), dir);
    env
  }

  pub fn version_tag(&self) -> String {
    format!("go{}", self.settings.version)
  }

  pub fn archive_url(&self, platform: Platform) -> String {
    format!(
      "{}/go{}.{}-{}.{}",
      self.settings.dist_url.trim_end_matches('/'),
      self.settings.version,
      platform.os,
      platform.arch,
      platform.os.archive_kind()
    )
  }

  fn initial_executable(&self, platform: Platform) -> PathBuf {
    self
      .settings
      .dir
      .join("go")
      .join("bin")
      .join(format!("go{}", platform.os.exe_suffix()))
  }

  pub fn pinned_executable(&self) -> PathBuf {
    let suffix = self.settings.host.map(|p| p.os.exe_suffix()).unwrap_or("");
    self
      .settings
      .dir
      .join("bin")
      .join(format!("{}{}", self.version_tag(), suffix))
  }
}

/// Whether `go version` output names exactly `go<version>`.
pub fn reports_version(output: &str, version: &str) -> bool {
  let tag = format!("go{version}");
  output.split_whitespace().any(|word| word == tag)
}
