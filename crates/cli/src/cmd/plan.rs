//! Implementation of the `shipwright plan` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use shipwright_lib::pipeline;

use super::{load_project, requested_tasks};
use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct PlanOutput {
  tasks: Vec<String>,
  waves: Vec<Vec<String>>,
}

pub fn cmd_plan(config: &Path, tasks: &[String], output: OutputFormat) -> Result<()> {
  let (project, _) = load_project(config)?;
  let graph = pipeline::task_graph(&project).context("Failed to declare release tasks")?;
  let tasks = requested_tasks(tasks);
  let waves = graph.plan(&tasks).context("Failed to plan tasks")?;

  if output.is_json() {
    return print_json(&PlanOutput { tasks, waves });
  }

  println!("Plan: {}", tasks.join(", "));
  for (i, wave) in waves.iter().enumerate() {
    println!("  Wave {}: {}", i + 1, wave.join(", "));
  }
  println!("Tasks: {}", waves.iter().map(Vec::len).sum::<usize>());
  Ok(())
}
