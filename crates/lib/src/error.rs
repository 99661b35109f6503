//! Top-level release error taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::exec::CommandError;
use crate::graph::GraphError;
use crate::license::LicenseError;
use crate::provenance::ProvenanceError;
use crate::target::Target;
use crate::toolchain::ToolchainError;

/// A fatal failure of a release task.
#[derive(Debug, Error)]
pub enum ReleaseError {
  /// Download, unpack or install of the pinned toolchain failed.
  #[error("toolchain unavailable: {0}")]
  ToolchainUnavailable(#[from] ToolchainError),

  /// The compiler failed or produced no binary for a target.
  #[error("build failed for {target}: {message}")]
  BuildFailure { target: Target, message: String },

  #[error("compression failed for {target}: {message}")]
  CompressionFailure { target: Target, message: String },

  /// Uploading or registering an artifact failed.
  #[error("publish to {destination} failed for {target}: {message}")]
  PublishFailure {
    destination: String,
    target: Target,
    message: String,
  },

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("license listing: {0}")]
  License(#[from] LicenseError),

  #[error("provenance unavailable: {0}")]
  Provenance(#[from] ProvenanceError),

  #[error(transparent)]
  Command(#[from] CommandError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl ReleaseError {
  /// The target a failure is attributed to, if any.
  pub fn target(&self) -> Option<&Target> {
    match self {
      Self::BuildFailure { target, .. }
      | Self::CompressionFailure { target, .. }
      | Self::PublishFailure { target, .. } => Some(target),
      _ => None,
    }
  }
}
