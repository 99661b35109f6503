//! Implementation of the `shipwright run` command.
//!
//! Runs the requested tasks (and their dependencies) exactly once each,
//! stops scheduling new work at the first failure, and reports which task
//! and target failed.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::error;

use shipwright_lib::config::RunOptions;
use shipwright_lib::consts::VERSION_OVERRIDE_ENV;
use shipwright_lib::context::{Backends, RunContext};
use shipwright_lib::graph::{ExecuteConfig, RunReport, run_tasks};
use shipwright_lib::{pipeline, target};

use super::{load_project, requested_tasks};
use crate::output::{
  OutputFormat, format_bytes, format_duration, print_error, print_info, print_json, print_stat, print_success,
  print_warning,
};

#[derive(Args, Debug)]
pub struct RunArgs {
  /// Tasks to run (default: build-all)
  tasks: Vec<String>,

  /// Explicit release version instead of the derived development version
  #[arg(long, env = VERSION_OVERRIDE_ENV)]
  release_version: Option<String>,

  /// Use a host-installed toolchain when it matches the pinned version
  #[arg(long, env = "SHIPWRIGHT_USE_HOST_TOOLCHAIN")]
  use_local_toolchain: bool,

  /// Disable compiler optimizations
  #[arg(long, env = "SHIPWRIGHT_DEBUG")]
  debug: bool,

  /// Strip symbols from the binaries
  #[arg(long, env = "SHIPWRIGHT_OPTIMIZE")]
  optimize: bool,

  /// Maximum number of tasks running at once (0: number of CPUs)
  #[arg(short = 'j', long, env = "SHIPWRIGHT_PARALLELISM", default_value_t = 0)]
  parallelism: usize,

  /// Publish into local directories instead of the remote services
  #[arg(long)]
  local: bool,

  /// Version the compiled program reports for itself
  #[arg(long)]
  cli_version: Option<String>,

  /// Artifact repository user
  #[arg(long, env = "SHIPWRIGHT_REPOSITORY_USERNAME")]
  repository_username: Option<String>,

  /// Artifact repository password
  #[arg(long, env = "SHIPWRIGHT_REPOSITORY_PASSWORD", hide_env_values = true)]
  repository_password: Option<String>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  output: OutputFormat,
}

impl RunArgs {
  fn options(&self) -> RunOptions {
    RunOptions {
      version_override: self.release_version.clone(),
      use_host_toolchain: self.use_local_toolchain,
      debug: self.debug,
      optimize: self.optimize,
      local_publish: self.local,
      parallelism: self.parallelism,
      cli_version: self.cli_version.clone(),
      repository_username: self.repository_username.clone(),
      repository_password: self.repository_password.clone(),
    }
  }
}

#[derive(Debug, Serialize)]
struct RunSummary {
  version: String,
  channel: String,
  completed: Vec<String>,
  failed: Option<FailedTask>,
  skipped: BTreeMap<String, String>,
  elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
struct FailedTask {
  task: String,
  target: Option<String>,
  error: String,
}

pub fn cmd_run(config: &Path, args: RunArgs) -> Result<()> {
  let (project, paths) = load_project(config)?;
  let options = args.options();
  let backends = Backends::from_options(&project, &paths, &options).context("Failed to set up publish backends")?;
  let ctx = RunContext::new(project, paths, options, backends).context("Failed to prepare release run")?;
  let graph = pipeline::task_graph(&ctx.config).context("Failed to declare release tasks")?;
  let tasks = requested_tasks(&args.tasks);
  let execute = ExecuteConfig::with_parallelism(ctx.options.parallelism);

  if !args.output.is_json() {
    print_info(&format!("Release {} ({})", ctx.version, ctx.channel));
  }

  let ctx = Arc::new(ctx);
  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(run_tasks(&graph, &tasks, Arc::clone(&ctx), &execute))
    .context("Failed to schedule tasks")?;
  let elapsed = started.elapsed();

  let failed = report.failed.as_ref().map(|(task, err)| FailedTask {
    task: task.clone(),
    target: err.target().map(ToString::to_string),
    error: err.to_string(),
  });
  if let Some(failure) = &failed {
    error!(task = %failure.task, error = %failure.error, "release run failed");
  }

  if args.output.is_json() {
    print_json(&RunSummary {
      version: ctx.version.clone(),
      channel: ctx.channel.to_string(),
      completed: report.completed.clone(),
      failed,
      skipped: report
        .skipped
        .iter()
        .map(|(task, reason)| (task.clone(), reason.to_string()))
        .collect(),
      elapsed_ms: elapsed.as_millis(),
    })?;
  } else {
    print_report(&ctx, &report, failed.as_ref());
    if failed.is_none() {
      print_success(&format!(
        "Completed {} task(s) in {}",
        report.completed.len(),
        format_duration(elapsed)
      ));
    }
  }

  if !report.is_success() {
    std::process::exit(1);
  }
  Ok(())
}

fn print_report(ctx: &RunContext, report: &RunReport, failed: Option<&FailedTask>) {
  for task in &report.completed {
    print_stat(task, pipeline::describe(task));
  }

  let binaries: Vec<_> = target::targets()
    .iter()
    .filter(|t| report.is_completed(&pipeline::build_task(t)))
    .filter_map(|t| {
      let path = t.output_path(&ctx.paths.output_dir, &ctx.config.project.binary_name);
      std::fs::metadata(&path).ok().map(|meta| (t, path, meta.len()))
    })
    .collect();
  if !binaries.is_empty() {
    println!();
    println!("Binaries:");
    for (target, path, size) in binaries {
      print_stat(&target.to_string(), &format!("{} ({})", path.display(), format_bytes(size)));
    }
  }

  for (task, reason) in &report.skipped {
    print_warning(&format!("Skipped {task}: {reason}"));
  }
  for (task, err) in &report.additional_failures {
    print_error(&format!("Task {task} also failed: {err}"));
  }
  if let Some(failure) = failed {
    let target = failure
      .target
      .as_ref()
      .map(|t| format!(" (target {t})"))
      .unwrap_or_default();
    print_error(&format!("Task {}{} failed: {}", failure.task, target, failure.error));
  }
}
