//! Executable compression.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use crate::context::RunContext;
use crate::error::ReleaseError;
use crate::exec;
use crate::target::Target;

/// Compress the built binary for `target` in place.
///
/// Only scheduled for targets with compression support; a target without it
/// is rejected here rather than silently skipped.
pub async fn compress(ctx: &RunContext, target: &Target) -> Result<PathBuf, ReleaseError> {
  let binary = target.output_path(&ctx.paths.output_dir, &ctx.config.project.binary_name);

  if !target.compression_supported {
    return Err(ReleaseError::CompressionFailure {
      target: *target,
      message: "compression is disabled for this target".to_string(),
    });
  }
  if !binary.exists() {
    return Err(ReleaseError::CompressionFailure {
      target: *target,
      message: format!("no binary at {}", binary.display()),
    });
  }

  let compressor = &ctx.config.build.compressor;
  info!(target = %target, compressor = %compressor, "compressing");

  exec::execute(
    compressor,
    &[binary.to_string_lossy().into_owned()],
    &BTreeMap::new(),
    ctx.root(),
  )
  .await
  .map_err(|e| ReleaseError::CompressionFailure {
    target: *target,
    message: e.to_string(),
  })?;

  Ok(binary)
}
