//! Release version and build provenance.
//!
//! The version is resolved once when a run starts. The remaining provenance
//! fields come from version control and the clock and are computed at most
//! once per run, then injected unchanged into every target's binary.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::exec::{self, CommandError};

/// Errors raised while collecting provenance.
#[derive(Debug, Error)]
pub enum ProvenanceError {
  #[error("version control query failed: {0}")]
  Vcs(#[from] CommandError),

  #[error("version control returned an empty {0}")]
  Empty(&'static str),
}

/// Release channel of a version string, driving publish routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
  PreRelease,
  Stable,
}

impl Channel {
  /// A version containing any of `markers` is a pre-release.
  pub fn classify(version: &str, markers: &[String]) -> Self {
    if markers.iter().any(|m| version.contains(m.as_str())) {
      Self::PreRelease
    } else {
      Self::Stable
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::PreRelease => write!(f, "pre-release"),
      Self::Stable => write!(f, "stable"),
    }
  }
}

/// Resolve the release version.
///
/// A non-empty override wins. Otherwise the version is
/// `<base>-<month><day>.<hour><minute>` from the local clock, with the month
/// and hour unpadded (`25.1.0-1017.930`). The tag carries no year and is not
/// guaranteed unique.
pub fn resolve_version(base_version: &str, version_override: Option<&str>, now: NaiveDateTime) -> String {
  match version_override {
    Some(v) if !v.is_empty() => v.to_string(),
    _ => format!("{}-{}", base_version, now.format("%-m%d.%-H%M")),
  }
}

/// [`resolve_version`] against the local clock.
pub fn current_version(base_version: &str, version_override: Option<&str>) -> String {
  resolve_version(base_version, version_override, Local::now().naive_local())
}

/// Format a UTC instant as ISO-8601 with millisecond precision.
pub fn format_build_timestamp(now: DateTime<Utc>) -> String {
  now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Strip a leading `<artifact_name>-` from a descriptive tag.
pub fn strip_artifact_prefix(tag: &str, artifact_name: &str) -> String {
  let prefix = format!("{artifact_name}-");
  tag.strip_prefix(&prefix).unwrap_or(tag).to_string()
}

/// Build-time constants embedded into every binary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
  pub version: String,
  pub build_tag: String,
  pub commit_hash: String,
  pub build_timestamp: String,
  pub binary_name: String,
}

/// Source of version-control facts about the checkout.
#[async_trait]
pub trait Vcs: Send + Sync {
  /// Full hash of the checked-out head commit.
  async fn head_commit(&self, root: &Path) -> Result<String, ProvenanceError>;

  /// Descriptive tag: nearest tag, distance, abbreviated hash and a dirty
  /// marker, falling back to the abbreviated hash when no tag exists.
  async fn describe(&self, root: &Path) -> Result<String, ProvenanceError>;
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

#[async_trait]
impl Vcs for GitCli {
  async fn head_commit(&self, root: &Path) -> Result<String, ProvenanceError> {
    let out = exec::execute("git", &exec::args(["rev-parse", "HEAD"]), &Default::default(), root).await?;
    non_empty(out, "commit hash")
  }

  async fn describe(&self, root: &Path) -> Result<String, ProvenanceError> {
    let out = exec::execute(
      "git",
      &exec::args(["describe", "--long", "--dirty", "--always"]),
      &Default::default(),
      root,
    )
    .await?;
    non_empty(out, "descriptive tag")
  }
}

fn non_empty(value: String, what: &'static str) -> Result<String, ProvenanceError> {
  if value.is_empty() {
    Err(ProvenanceError::Empty(what))
  } else {
    Ok(value)
  }
}

/// Compute the provenance record for a run.
pub async fn compute_provenance(
  vcs: &dyn Vcs,
  root: &Path,
  version: &str,
  binary_name: &str,
  artifact_name: &str,
  now: DateTime<Utc>,
) -> Result<Provenance, ProvenanceError> {
  let commit_hash = vcs.head_commit(root).await?;
  let described = vcs.describe(root).await?;

  Ok(Provenance {
    version: version.to_string(),
    build_tag: strip_artifact_prefix(&described, artifact_name),
    commit_hash,
    build_timestamp: format_build_timestamp(now),
    binary_name: binary_name.to_string(),
  })
}
