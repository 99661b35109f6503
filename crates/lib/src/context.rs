//! Immutable per-run state shared by every task.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{ConfigError, ProjectConfig, ProjectPaths, RunOptions};
use crate::error::ReleaseError;
use crate::license::LicenseAggregator;
use crate::platform::{Platform, paths};
use crate::provenance::{self, Channel, GitCli, Provenance, Vcs};
use crate::publish::{
  ArtifactRepository, Credentials, HttpArtifactRepository, HttpObjectStore, LocalObjectStore, LocalRepository,
  ObjectStore, Publisher,
};
use crate::toolchain::{Bootstrapper, ToolchainSettings};

/// External collaborators of a run.
pub struct Backends {
  pub vcs: Arc<dyn Vcs>,
  pub store: Arc<dyn ObjectStore>,
  pub repository: Arc<dyn ArtifactRepository>,
}

impl Backends {
  /// Git plus either the HTTP services or, with `local_publish`, their
  /// filesystem mirrors.
  pub fn from_options(config: &ProjectConfig, paths: &ProjectPaths, options: &RunOptions) -> Result<Self, ReleaseError> {
    let vcs: Arc<dyn Vcs> = Arc::new(GitCli);

    if options.local_publish {
      let repository_root = paths
        .local_repository
        .clone()
        .ok_or_else(|| ConfigError::Invalid("no home directory; set publish.local_repository".to_string()))?;
      return Ok(Self {
        vcs,
        store: Arc::new(LocalObjectStore::new(&paths.local_object_store)),
        repository: Arc::new(LocalRepository::new(repository_root)),
      });
    }

    let credentials = options.repository_username.clone().map(|username| Credentials {
      username,
      password: options.repository_password.clone(),
    });
    let store = HttpObjectStore::new(config.publish.object_store_url.clone())
      .map_err(|e| ConfigError::Invalid(format!("object store client: {e}")))?;
    let repository = HttpArtifactRepository::new(config.publish.repository_url.clone(), credentials)
      .map_err(|e| ConfigError::Invalid(format!("repository client: {e}")))?;

    Ok(Self {
      vcs,
      store: Arc::new(store),
      repository: Arc::new(repository),
    })
  }
}

/// Everything a task may read. Built once, never mutated except for the
/// once-only provenance and toolchain cells.
pub struct RunContext {
  pub config: ProjectConfig,
  pub paths: ProjectPaths,
  pub options: RunOptions,
  /// Resolved release version.
  pub version: String,
  pub channel: Channel,
  pub bootstrapper: Bootstrapper,
  pub publisher: Publisher,
  pub licenses: LicenseAggregator,
  vcs: Arc<dyn Vcs>,
  provenance: OnceCell<Provenance>,
}

impl RunContext {
  pub fn new(
    config: ProjectConfig,
    paths: ProjectPaths,
    options: RunOptions,
    backends: Backends,
  ) -> Result<Self, ReleaseError> {
    let version = provenance::current_version(&config.project.base_version, options.version_override.as_deref());
    let channel = Channel::classify(&version, &config.project.prerelease_markers);
    info!(version = %version, channel = %channel, "resolved release version");

    let settings = ToolchainSettings {
      version: config.toolchain.version.clone(),
      dist_url: config.toolchain.dist_url.clone(),
      installer: config.toolchain.installer.clone(),
      dir: paths::toolchain_dir(&paths.cache_dir),
      workdir: paths.root.clone(),
      checksums: config.toolchain.checksums.clone(),
      use_host: options.use_host_toolchain,
      host: Platform::current(),
      host_executable: "go".to_string(),
    };
    debug!(dir = ?settings.dir, "toolchain cache");

    let publisher = Publisher::new(&config, backends.store, backends.repository);
    let licenses = LicenseAggregator::new(config.licenses.url_scheme.clone())?;

    Ok(Self {
      bootstrapper: Bootstrapper::new(settings),
      publisher,
      licenses,
      vcs: backends.vcs,
      provenance: OnceCell::new(),
      version,
      channel,
      config,
      paths,
      options,
    })
  }

  pub fn root(&self) -> &Path {
    &self.paths.root
  }

  /// Provenance of this run, computed on first use and then reused unchanged.
  pub async fn provenance(&self) -> Result<&Provenance, ReleaseError> {
    let provenance = self
      .provenance
      .get_or_try_init(|| async {
        let record = provenance::compute_provenance(
          self.vcs.as_ref(),
          &self.paths.root,
          &self.version,
          &self.config.project.binary_name,
          &self.config.project.artifact_name,
          Utc::now(),
        )
        .await?;
        info!(
          commit = %record.commit_hash,
          build_tag = %record.build_tag,
          build_timestamp = %record.build_timestamp,
          "computed provenance"
        );
        Ok::<_, ReleaseError>(record)
      })
      .await?;
    Ok(provenance)
  }

  /// Version embedded as the program's own version.
  pub fn cli_version(&self) -> &str {
    match self.options.cli_version.as_deref() {
      Some(v) if !v.is_empty() => v,
      _ => &self.version,
    }
  }
}
