//! License listing regeneration.
//!
//! Every manifest line that starts with indentation followed by a module-path
//! token (`^\s+[a-zA-Z0-9./\-]+`) contributes one line: the token prefixed
//! with the URL scheme. Any other line is skipped. The previous listing is
//! removed before the new one is written.

use std::path::Path;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Leading whitespace, then letters, digits, dots, slashes and hyphens.
pub const MODULE_LINE_PATTERN: &str = r"^\s+[a-zA-Z0-9./\-]+";

#[derive(Debug, Error)]
pub enum LicenseError {
  #[error("invalid module pattern: {0}")]
  Pattern(#[from] regex::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Result of scanning a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseListing {
  /// One URL per extracted module, in manifest order.
  pub entries: Vec<String>,
  /// Lines that did not match the module pattern.
  pub skipped: usize,
}

impl LicenseListing {
  /// Listing file contents, one newline-terminated URL per entry.
  pub fn render(&self) -> String {
    self.entries.iter().map(|e| format!("{e}\n")).collect()
  }
}

pub struct LicenseAggregator {
  pattern: Regex,
  url_scheme: String,
}

impl LicenseAggregator {
  pub fn new(url_scheme: impl Into<String>) -> Result<Self, LicenseError> {
    Ok(Self {
      pattern: Regex::new(MODULE_LINE_PATTERN)?,
      url_scheme: url_scheme.into(),
    })
  }

  /// Extract license URLs from manifest text.
  pub fn extract(&self, manifest: &str) -> LicenseListing {
    let mut entries = Vec::new();
    let mut skipped = 0;

    for line in manifest.lines() {
      match self.pattern.find(line) {
        Some(m) => entries.push(format!("{}{}", self.url_scheme, m.as_str().trim())),
        None => skipped += 1,
      }
    }

    LicenseListing { entries, skipped }
  }

  /// Regenerate `output` from `manifest`.
  ///
  /// Returns `None` without touching `output` when the manifest is missing.
  pub async fn regenerate(&self, manifest: &Path, output: &Path) -> Result<Option<LicenseListing>, LicenseError> {
    if !manifest.exists() {
      warn!(manifest = ?manifest, "dependency manifest missing, license listing left unchanged");
      return Ok(None);
    }

    let content = tokio::fs::read_to_string(manifest).await?;
    let listing = self.extract(&content);
    debug!(skipped = listing.skipped, "manifest lines without a module path");

    match tokio::fs::remove_file(output).await {
      Ok(()) => debug!(path = ?output, "removed previous license listing"),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => return Err(e.into()),
    }
    if let Some(parent) = output.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, listing.render()).await?;

    info!(path = ?output, entries = listing.entries.len(), "regenerated license listing");
    Ok(Some(listing))
  }
}
