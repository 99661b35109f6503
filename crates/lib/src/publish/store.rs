//! Binary object storage backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{PublishError, http_client};

/// Object storage that binaries are uploaded to, keyed by bucket and key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
  /// Human-readable location used in error context.
  fn describe(&self, bucket: &str) -> String;

  /// Upload `file` as `key` in `bucket`, replacing any existing object.
  async fn put(&self, bucket: &str, key: &str, file: &Path) -> Result<(), PublishError>;
}

/// Object store reached over HTTP: `PUT <endpoint>/<bucket>/<key>`.
pub struct HttpObjectStore {
  endpoint: Option<String>,
  client: reqwest::Client,
}

impl HttpObjectStore {
  /// `endpoint` may be absent; uploads then fail with a configuration error.
  pub fn new(endpoint: Option<String>) -> Result<Self, PublishError> {
    Ok(Self {
      endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
      client: http_client()?,
    })
  }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
  fn describe(&self, bucket: &str) -> String {
    match &self.endpoint {
      Some(endpoint) => format!("object store {endpoint}/{bucket}"),
      None => format!("object store bucket {bucket}"),
    }
  }

  async fn put(&self, bucket: &str, key: &str, file: &Path) -> Result<(), PublishError> {
    let endpoint = self
      .endpoint
      .as_deref()
      .ok_or(PublishError::MissingEndpoint("publish.object_store_url"))?;
    let url = format!("{endpoint}/{bucket}/{key}");
    let body = tokio::fs::read(file).await?;

    debug!(url = %url, size = body.len(), "uploading object");

    let response = self
      .client
      .put(&url)
      .body(body)
      .send()
      .await
      .map_err(|e| PublishError::Http {
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

/// Object store mirrored into a local directory: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
  root: PathBuf,
}

impl LocalObjectStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
    key.split('/').fold(self.root.join(bucket), |path, part| path.join(part))
  }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
  fn describe(&self, bucket: &str) -> String {
    format!("local object store {}", self.root.join(bucket).display())
  }

  async fn put(&self, bucket: &str, key: &str, file: &Path) -> Result<(), PublishError> {
    let dest = self.object_path(bucket, key);
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(file, &dest).await?;
    debug!(path = ?dest, "stored object");
    Ok(())
  }
}
