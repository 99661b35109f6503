//! Versioned artifact repository backends (Maven layout).

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{PublishError, http_client};

/// Where an artifact is registered inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCoordinates {
  pub group: String,
  pub artifact: String,
  pub version: String,
  pub classifier: String,
  pub extension: String,
}

impl ArtifactCoordinates {
  /// Repository-relative path:
  /// `<group as path>/<artifact>/<version>/<artifact>-<version>-<classifier>.<extension>`.
  pub fn path(&self) -> String {
    format!(
      "{}/{}/{}/{}-{}-{}.{}",
      self.group.replace('.', "/"),
      self.artifact,
      self.version,
      self.artifact,
      self.version,
      self.classifier,
      self.extension
    )
  }
}

impl fmt::Display for ArtifactCoordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}:{}:{}:{}@{}",
      self.group, self.artifact, self.version, self.classifier, self.extension
    )
  }
}

#[async_trait]
pub trait ArtifactRepository: Send + Sync {
  /// Human-readable location used in error context.
  fn describe(&self, repository: &str) -> String;

  /// Register `file` under `coordinates` in `repository`.
  async fn deploy(&self, repository: &str, coordinates: &ArtifactCoordinates, file: &Path) -> Result<(), PublishError>;
}

/// Credentials passed through to the repository unchanged.
#[derive(Clone)]
pub struct Credentials {
  pub username: String,
  pub password: Option<String>,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .field("password", &self.password.as_ref().map(|_| "***"))
      .finish()
  }
}

/// Repository reached over HTTP: `PUT <base>/<repository>/<path>`.
pub struct HttpArtifactRepository {
  base_url: Option<String>,
  credentials: Option<Credentials>,
  client: reqwest::Client,
}

impl HttpArtifactRepository {
  pub fn new(base_url: Option<String>, credentials: Option<Credentials>) -> Result<Self, PublishError> {
    Ok(Self {
      base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
      credentials,
      client: http_client()?,
    })
  }
}

#[async_trait]
impl ArtifactRepository for HttpArtifactRepository {
  fn describe(&self, repository: &str) -> String {
    match &self.base_url {
      Some(base) => format!("{base}/{repository}"),
      None => repository.to_string(),
    }
  }

  async fn deploy(&self, repository: &str, coordinates: &ArtifactCoordinates, file: &Path) -> Result<(), PublishError> {
    let base = self
      .base_url
      .as_deref()
      .ok_or(PublishError::MissingEndpoint("publish.repository_url"))?;
    let url = format!("{}/{}/{}", base, repository.trim_matches('/'), coordinates.path());
    let body = tokio::fs::read(file).await?;

    debug!(url = %url, coordinates = %coordinates, "deploying artifact");

    let mut request = self.client.put(&url).body(body);
    if let Some(credentials) = &self.credentials {
      request = request.basic_auth(&credentials.username, credentials.password.as_ref());
    }

    let response = request.send().await.map_err(|e| PublishError::Http {
      url: url.clone(),
      message: e.to_string(),
    })?;

    if !response.status().is_success() {
      return Err(PublishError::Status {
        url,
        status: response.status().as_u16(),
      });
    }
    Ok(())
  }
}

/// Local Maven-layout repository. The channel repository name is not part
/// of the layout; a local repository holds every channel.
#[derive(Debug, Clone)]
pub struct LocalRepository {
  root: PathBuf,
}

impl LocalRepository {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn artifact_path(&self, coordinates: &ArtifactCoordinates) -> PathBuf {
    coordinates
      .path()
      .split('/')
      .fold(self.root.clone(), |path, part| path.join(part))
  }
}

#[async_trait]
impl ArtifactRepository for LocalRepository {
  fn describe(&self, _repository: &str) -> String {
    format!("local repository {}", self.root.display())
  }

  async fn deploy(&self, _repository: &str, coordinates: &ArtifactCoordinates, file: &Path) -> Result<(), PublishError> {
    let dest = self.artifact_path(coordinates);
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(file, &dest).await?;
    debug!(path = ?dest, coordinates = %coordinates, "installed artifact locally");
    Ok(())
  }
}
