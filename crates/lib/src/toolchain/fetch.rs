//! Toolchain archive download.
//!
//! Downloads an archive into the toolchain directory, optionally verifying its
//! SHA256 hash. A previously downloaded archive with a matching hash is reused.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::ToolchainError;

/// Download `url` to `dest`.
///
/// When `expected_sha256` is given, a cached file at `dest` with that hash is
/// reused and a freshly downloaded file must match it. Returns whether the
/// network was used.
pub async fn fetch_archive(url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<bool, ToolchainError> {
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).await?;
  }

  if let Some(expected) = expected_sha256
    && dest.exists()
  {
    debug!(path = ?dest, "checking cached archive");
    if let Ok(actual) = hash_file(dest).await {
      if actual == expected {
        info!(path = ?dest, "using cached archive");
        return Ok(false);
      }
      debug!(expected = %expected, actual = %actual, "cached archive hash mismatch, re-downloading");
    }
  }

  info!(url = %url, "fetching toolchain archive");

  let response = reqwest::get(url).await.map_err(|e| ToolchainError::FetchFailed {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(ToolchainError::FetchFailed {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let bytes = response.bytes().await.map_err(|e| ToolchainError::FetchFailed {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if let Some(expected) = expected_sha256 {
    let actual = hex::encode(Sha256::digest(&bytes));
    if actual != expected {
      return Err(ToolchainError::HashMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
        actual,
      });
    }
  }

  let mut file = fs::File::create(dest).await?;
  file.write_all(&bytes).await?;
  file.flush().await?;

  info!(path = ?dest, size = bytes.len(), "download complete");

  Ok(true)
}

/// Compute SHA256 hash of a file.
async fn hash_file(path: &Path) -> Result<String, std::io::Error> {
  let bytes = fs::read(path).await?;
  Ok(hex::encode(Sha256::digest(&bytes)))
}

/// File name portion of a download URL, without any query string.
pub fn archive_file_name(url: &str) -> Option<&str> {
  let last = url.rsplit('/').next()?;
  let name = last.split('?').next().unwrap_or(last);
  if name.is_empty() { None } else { Some(name) }
}

/// Where the downloaded archive is kept inside the toolchain directory.
pub fn archive_path(dir: &Path, kind_extension: &str) -> PathBuf {
  dir.join(format!("go.{kind_extension}"))
}
