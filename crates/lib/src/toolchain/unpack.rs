//! Toolchain archive extraction.

use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::info;

use super::ToolchainError;
use crate::platform::os::ArchiveKind;

/// Unpack `archive` into `into`, blocking a worker thread rather than the
/// runtime.
pub async fn unpack(archive: &Path, into: &Path, kind: ArchiveKind) -> Result<(), ToolchainError> {
  let archive = archive.to_path_buf();
  let into = into.to_path_buf();

  info!(archive = ?archive, into = ?into, "unpacking toolchain archive");

  let task_archive = archive.clone();
  tokio::task::spawn_blocking(move || unpack_blocking(&task_archive, &into, kind))
    .await
    .map_err(|e| ToolchainError::Unpack {
      archive: archive.clone(),
      message: e.to_string(),
    })?
    .map_err(|message| ToolchainError::Unpack { archive, message })
}

fn unpack_blocking(archive: &Path, into: &Path, kind: ArchiveKind) -> Result<(), String> {
  std::fs::create_dir_all(into).map_err(|e| e.to_string())?;
  let file = File::open(archive).map_err(|e| e.to_string())?;

  match kind {
    ArchiveKind::TarGz => {
      let mut tar = tar::Archive::new(GzDecoder::new(file));
      tar.set_preserve_permissions(true);
      tar.unpack(into).map_err(|e| e.to_string())
    }
    ArchiveKind::Zip => {
      let mut zip = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
      zip.extract(into).map_err(|e| e.to_string())
    }
  }
}
