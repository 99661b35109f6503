//! Artifact publishing.
//!
//! Each target's binary goes to two places: the object store, under a key
//! independent of the release channel, and the artifact repository, whose
//! destination is chosen by the version's channel.

pub mod repository;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::ProjectConfig;
use crate::consts::OBJECT_KEY_PREFIX;
use crate::error::ReleaseError;
use crate::provenance::{Channel, Provenance};
use crate::target::Target;

pub use repository::{ArtifactCoordinates, ArtifactRepository, Credentials, HttpArtifactRepository, LocalRepository};
pub use store::{HttpObjectStore, LocalObjectStore, ObjectStore};

/// Errors raised by publish backends.
#[derive(Debug, Error)]
pub enum PublishError {
  #[error("request to {url} failed: {message}")]
  Http { url: String, message: String },

  #[error("{url} responded with HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("{0} is not configured")]
  MissingEndpoint(&'static str),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub(crate) fn http_client() -> Result<reqwest::Client, PublishError> {
  reqwest::Client::builder()
    .user_agent(concat!("shipwright/", env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(|e| PublishError::Http {
      url: String::new(),
      message: e.to_string(),
    })
}

/// Repository destination selected by a version's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
  pub channel: Channel,
  pub repository: String,
}

/// What a successful publish wrote where.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
  pub object_key: String,
  pub destination: Destination,
  pub coordinates: ArtifactCoordinates,
}

/// Object storage key: `bin/<version>/<target>/<binary><ext>`.
pub fn object_key(version: &str, target: &Target, binary_name: &str) -> String {
  format!(
    "{}/{}/{}/{}",
    OBJECT_KEY_PREFIX,
    version,
    target,
    target.binary_file_name(binary_name)
  )
}

/// Routes binaries to the object store and the artifact repository.
pub struct Publisher {
  store: Arc<dyn ObjectStore>,
  repository: Arc<dyn ArtifactRepository>,
  bucket: String,
  group: String,
  artifact_name: String,
  prerelease_markers: Vec<String>,
  prerelease_repository: String,
  stable_repository: String,
}

impl Publisher {
  pub fn new(config: &ProjectConfig, store: Arc<dyn ObjectStore>, repository: Arc<dyn ArtifactRepository>) -> Self {
    Self {
      store,
      repository,
      bucket: config.bucket().to_string(),
      group: config.project.group.clone(),
      artifact_name: config.project.artifact_name.clone(),
      prerelease_markers: config.project.prerelease_markers.clone(),
      prerelease_repository: config.publish.prerelease_repository.clone(),
      stable_repository: config.publish.stable_repository.clone(),
    }
  }

  /// Choose the repository destination for `version`.
  pub fn destination(&self, version: &str) -> Destination {
    let channel = Channel::classify(version, &self.prerelease_markers);
    let repository = match channel {
      Channel::PreRelease => &self.prerelease_repository,
      Channel::Stable => &self.stable_repository,
    };
    Destination {
      channel,
      repository: repository.clone(),
    }
  }

  pub fn coordinates(&self, target: &Target, version: &str) -> ArtifactCoordinates {
    ArtifactCoordinates {
      group: self.group.clone(),
      artifact: self.artifact_name.clone(),
      version: version.to_string(),
      classifier: target.to_string(),
      extension: target.release_extension.to_string(),
    }
  }

  /// Publish one target's binary. Independent of every other target.
  pub async fn publish(
    &self,
    target: &Target,
    binary: &Path,
    provenance: &Provenance,
  ) -> Result<PublishReceipt, ReleaseError> {
    let version = provenance.version.as_str();
    let key = object_key(version, target, &provenance.binary_name);
    let destination = self.destination(version);
    let coordinates = self.coordinates(target, version);

    self
      .store
      .put(&self.bucket, &key, binary)
      .await
      .map_err(|e| ReleaseError::PublishFailure {
        destination: self.store.describe(&self.bucket),
        target: *target,
        message: e.to_string(),
      })?;
    info!(target = %target, key = %key, "uploaded binary");

    self
      .repository
      .deploy(&destination.repository, &coordinates, binary)
      .await
      .map_err(|e| ReleaseError::PublishFailure {
        destination: self.repository.describe(&destination.repository),
        target: *target,
        message: e.to_string(),
      })?;
    info!(
      target = %target,
      channel = %destination.channel,
      repository = %destination.repository,
      coordinates = %coordinates,
      "registered artifact"
    );

    Ok(PublishReceipt {
      object_key: key,
      destination,
      coordinates,
    })
  }
}
