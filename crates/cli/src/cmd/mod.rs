mod info;
mod plan;
mod run;
mod tasks;

pub use info::cmd_info;
pub use plan::cmd_plan;
pub use run::{RunArgs, cmd_run};
pub use tasks::cmd_tasks;

use std::path::Path;

use anyhow::{Context, Result};

use shipwright_lib::config::{ProjectConfig, ProjectPaths};
use shipwright_lib::pipeline::DEFAULT_TASK;

/// Load the project file and resolve paths against its directory.
fn load_project(config: &Path) -> Result<(ProjectConfig, ProjectPaths)> {
  let project = ProjectConfig::load(config).with_context(|| format!("Failed to load {}", config.display()))?;
  let root = match config.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  let paths = ProjectPaths::new(root, &project);
  Ok((project, paths))
}

/// Requested tasks, or the default task when none are named.
fn requested_tasks(tasks: &[String]) -> Vec<String> {
  if tasks.is_empty() {
    vec![DEFAULT_TASK.to_string()]
  } else {
    tasks.to_vec()
  }
}
