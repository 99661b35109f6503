//! Per-target compiler invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::context::RunContext;
use crate::error::ReleaseError;
use crate::exec;
use crate::provenance::Provenance;
use crate::target::Target;
use crate::toolchain::ToolchainHandle;

/// Linker-injected constants and their values.
pub fn link_constants<'a>(provenance: &'a Provenance, cli_version: &'a str) -> [(&'static str, &'a str); 5] {
  [
    ("CliVersion", cli_version),
    ("BuildVersion", provenance.build_tag.as_str()),
    ("BuildGitCommit", provenance.commit_hash.as_str()),
    ("BuildDate", provenance.build_timestamp.as_str()),
    ("BinaryName", provenance.binary_name.as_str()),
  ]
}

/// The `-ldflags=` argument setting each constant in `<symbol_package>.`,
/// with symbol stripping appended when optimizing.
pub fn ldflags(symbol_package: &str, constants: &[(&str, &str)], optimize: bool) -> String {
  let mut flags: Vec<String> = constants
    .iter()
    .map(|(name, value)| format!("-X \"{symbol_package}.{name}={value}\""))
    .collect();
  if optimize {
    flags.push("-s -w".to_string());
  }
  format!("-ldflags={}", flags.join(" "))
}

/// Environment of a cross-compilation for `target`.
pub fn build_env(target: &Target, toolchain: &ToolchainHandle) -> BTreeMap<String, String> {
  let mut env = toolchain.env().clone();
  env.insert("GOOS".to_string(), target.os.to_string());
  env.insert("GOARCH".to_string(), target.arch.to_string());
  env.insert("GOEXE".to_string(), target.binary_extension.to_string());
  env.insert("CGO_ENABLED".to_string(), "0".to_string());
  env
}

/// Compile the binary for `target` and return its path.
pub async fn compile(ctx: &RunContext, target: &Target) -> Result<PathBuf, ReleaseError> {
  let toolchain = ctx.bootstrapper.ensure().await?;
  let provenance = ctx.provenance().await?;
  let project = &ctx.config.project;

  let output = target.output_path(&ctx.paths.output_dir, &project.binary_name);
  if let Some(parent) = output.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }

  let symbol_package = format!("{}/{}/cmd", project.package_path, project.main_path);
  let constants = link_constants(provenance, ctx.cli_version());
  let ldflags = ldflags(&symbol_package, &constants, ctx.options.optimize);
  debug!(target = %target, ldflags = %ldflags, "linker flags");

  let mut args = vec!["build".to_string(), ldflags];
  if ctx.options.debug {
    args.extend(exec::args(["-gcflags", "all=-N -l"]));
  }
  args.extend([
    "-o".to_string(),
    output.to_string_lossy().into_owned(),
    "-v".to_string(),
    format!("{}/main.go", project.main_path),
  ]);

  info!(target = %target, output = ?output, "compiling");
  exec::execute(
    &toolchain.executable_path,
    &args,
    &build_env(target, &toolchain),
    ctx.root(),
  )
  .await
  .map_err(|e| ReleaseError::BuildFailure {
    target: *target,
    message: e.to_string(),
  })?;

  let size = match tokio::fs::metadata(&output).await {
    Ok(meta) => meta.len(),
    Err(_) => 0,
  };
  if size == 0 {
    return Err(ReleaseError::BuildFailure {
      target: *target,
      message: format!("compiler produced no binary at {}", output.display()),
    });
  }

  info!(target = %target, size, "compiled");
  Ok(output)
}
