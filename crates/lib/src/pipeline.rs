//! The release task definitions.
//!
//! Every task is declared here, statically, and collected into a validated
//! [`TaskGraph`] before anything runs. Per-target tasks are expanded from the
//! target matrix in matrix order.

use std::sync::Arc;

use tracing::{info, warn};

use crate::compile;
use crate::compress;
use crate::config::ProjectConfig;
use crate::context::RunContext;
use crate::error::ReleaseError;
use crate::exec;
use crate::graph::{GraphError, TaskGraph, TaskGraphBuilder, action};
use crate::platform::paths;
use crate::target::{self, Target};

pub const DUMP_VERSION: &str = "dump-version";
pub const BOOTSTRAP: &str = "bootstrap";
pub const INSTALL_TOOLS: &str = "install-tools";
pub const FMT: &str = "fmt";
pub const REGENERATE_LICENSES: &str = "regenerate-licenses";
pub const BUILD_ALL: &str = "build-all";
pub const COMPRESS_ALL: &str = "compress-all";
pub const PUBLISH_ALL: &str = "publish-all";
pub const TEST: &str = "test";
pub const UPDATE: &str = "update";
pub const CLEAN: &str = "clean";

/// Task run when none is named.
pub const DEFAULT_TASK: &str = BUILD_ALL;

pub fn build_task(target: &Target) -> String {
  format!("build-{target}")
}

pub fn compress_task(target: &Target) -> String {
  format!("compress-{target}")
}

pub fn publish_task(target: &Target) -> String {
  format!("publish-{target}")
}

/// Short description of each task, for listings.
pub fn describe(task: &str) -> &'static str {
  match task {
    DUMP_VERSION => "write the resolved version to the version dump file",
    BOOTSTRAP => "ensure the pinned toolchain is installed",
    INSTALL_TOOLS => "install configured tool modules",
    FMT => "format the main package",
    REGENERATE_LICENSES => "regenerate the license listing from the manifest",
    BUILD_ALL => "build every target",
    COMPRESS_ALL => "compress every target that supports it",
    PUBLISH_ALL => "publish every target",
    TEST => "run the test suite",
    UPDATE => "update dependencies and tidy the module",
    CLEAN => "remove build output and the toolchain cache",
    t if t.starts_with("build-") => "build one target",
    t if t.starts_with("compress-") => "compress one target",
    t if t.starts_with("publish-") => "publish one target",
    _ => "",
  }
}

/// Declare every release task.
pub fn task_graph(config: &ProjectConfig) -> Result<TaskGraph<RunContext>, GraphError> {
  let mut builder = TaskGraphBuilder::new();
  let none: [&str; 0] = [];

  builder
    .register(DUMP_VERSION, none, Some(action(|ctx: Arc<RunContext>| async move { dump_version(&ctx).await })))
    .register(
      BOOTSTRAP,
      [DUMP_VERSION],
      Some(action(|ctx: Arc<RunContext>| async move {
        let handle = ctx.bootstrapper.ensure().await?;
        info!(version = %handle.version_tag, path = ?handle.executable_path, "toolchain available");
        Ok(())
      })),
    )
    .register(INSTALL_TOOLS, [BOOTSTRAP], Some(action(|ctx: Arc<RunContext>| async move { install_tools(&ctx).await })))
    .register(
      FMT,
      [BOOTSTRAP],
      Some(action(|ctx: Arc<RunContext>| async move {
        let main = format!("{}/main.go", ctx.config.project.main_path);
        go(&ctx, &["fmt", main.as_str()]).await
      })),
    )
    .register(
      REGENERATE_LICENSES,
      none,
      Some(action(|ctx: Arc<RunContext>| async move {
        ctx
          .licenses
          .regenerate(&ctx.paths.license_manifest, &ctx.paths.license_output)
          .await?;
        Ok(())
      })),
    );

  for target in target::targets() {
    let target = *target;
    builder.register(
      build_task(&target),
      [BOOTSTRAP, INSTALL_TOOLS, FMT, REGENERATE_LICENSES],
      Some(action(move |ctx: Arc<RunContext>| async move {
        compile::compile(&ctx, &target).await.map(|_| ())
      })),
    );
  }
  builder.register(BUILD_ALL, target::targets().iter().map(build_task), None);

  for target in target::targets().iter().filter(|t| t.compression_supported) {
    let target = *target;
    builder.register(
      compress_task(&target),
      [build_task(&target)],
      Some(action(move |ctx: Arc<RunContext>| async move {
        compress::compress(&ctx, &target).await.map(|_| ())
      })),
    );
  }
  builder.register(
    COMPRESS_ALL,
    target::targets()
      .iter()
      .filter(|t| t.compression_supported)
      .map(compress_task),
    None,
  );

  // Nothing is published until every target has built. Compression rewrites
  // the binary in place, so a publish never overlaps its target's compression.
  for target in target::targets() {
    let target = *target;
    let mut dependencies = vec![BUILD_ALL.to_string()];
    if target.compression_supported {
      if config.build.compress_before_publish {
        dependencies.push(compress_task(&target));
      } else {
        builder.must_run_after(publish_task(&target), compress_task(&target));
      }
    }
    builder.register(
      publish_task(&target),
      dependencies,
      Some(action(move |ctx: Arc<RunContext>| async move { publish(&ctx, &target).await })),
    );
  }
  let mut publish_all: Vec<String> = target::targets().iter().map(publish_task).collect();
  publish_all.push(DUMP_VERSION.to_string());
  builder.register(PUBLISH_ALL, publish_all, None);

  builder
    .register(TEST, [BOOTSTRAP], Some(action(|ctx: Arc<RunContext>| async move { go(&ctx, &["test", "./..."]).await })))
    .register(
      UPDATE,
      [BOOTSTRAP],
      Some(action(|ctx: Arc<RunContext>| async move {
        go(&ctx, &["get", "-u", "..."]).await?;
        go(&ctx, &["mod", "tidy"]).await
      })),
    )
    .register(CLEAN, none, Some(action(|ctx: Arc<RunContext>| async move { clean(&ctx).await })));

  builder.build()
}

/// Run the pinned toolchain with `args` in the project root.
async fn go(ctx: &RunContext, args: &[&str]) -> Result<(), ReleaseError> {
  let toolchain = ctx.bootstrapper.ensure().await?;
  exec::execute(
    &toolchain.executable_path,
    &exec::args(args.iter().copied()),
    toolchain.env(),
    ctx.root(),
  )
  .await?;
  Ok(())
}

async fn dump_version(ctx: &RunContext) -> Result<(), ReleaseError> {
  let file = paths::version_dump_file(&ctx.paths.output_dir);
  if let Some(parent) = file.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(&file, format!("version={}", ctx.version)).await?;
  info!(path = ?file, version = %ctx.version, "wrote version dump");
  Ok(())
}

async fn install_tools(ctx: &RunContext) -> Result<(), ReleaseError> {
  for tool in &ctx.config.toolchain.tools {
    info!(tool = %tool, "installing tool");
    go(ctx, &["get", tool.as_str()]).await?;
    go(ctx, &["install", tool.as_str()]).await?;
  }
  Ok(())
}

async fn publish(ctx: &RunContext, target: &Target) -> Result<(), ReleaseError> {
  let provenance = ctx.provenance().await?;
  let binary = target.output_path(&ctx.paths.output_dir, &ctx.config.project.binary_name);
  if !binary.exists() {
    return Err(ReleaseError::PublishFailure {
      destination: ctx.publisher.destination(&ctx.version).repository,
      target: *target,
      message: format!("no binary at {}", binary.display()),
    });
  }
  ctx.publisher.publish(target, &binary, provenance).await?;
  Ok(())
}

async fn clean(ctx: &RunContext) -> Result<(), ReleaseError> {
  for dir in [&ctx.paths.output_dir, &ctx.paths.cache_dir] {
    match tokio::fs::remove_dir_all(dir).await {
      Ok(()) => info!(path = ?dir, "removed"),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => {
        warn!(path = ?dir, error = %e, "failed to remove");
        return Err(e.into());
      }
    }
  }
  Ok(())
}
