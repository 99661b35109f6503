//! Implementation of the `shipwright tasks` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use shipwright_lib::{pipeline, target};

use super::load_project;
use crate::output::{OutputFormat, print_json, print_stat};

#[derive(Debug, Serialize)]
struct TaskEntry<'a> {
  name: &'a str,
  description: &'static str,
  dependencies: &'a [String],
}

#[derive(Debug, Serialize)]
struct TasksOutput<'a> {
  tasks: Vec<TaskEntry<'a>>,
  compression_disabled: Vec<String>,
}

pub fn cmd_tasks(config: &Path, output: OutputFormat) -> Result<()> {
  let (project, _) = load_project(config)?;
  let graph = pipeline::task_graph(&project).context("Failed to declare release tasks")?;
  let compression_disabled: Vec<String> = target::without_compression().map(ToString::to_string).collect();

  let tasks: Vec<TaskEntry> = graph
    .names()
    .map(|name| TaskEntry {
      name,
      description: pipeline::describe(name),
      dependencies: graph.dependencies(name).unwrap_or_default(),
    })
    .collect();

  if output.is_json() {
    return print_json(&TasksOutput {
      tasks,
      compression_disabled,
    });
  }

  for task in &tasks {
    if task.dependencies.is_empty() {
      print_stat(task.name, task.description);
    } else {
      print_stat(
        task.name,
        &format!("{} (after {})", task.description, task.dependencies.join(", ")),
      );
    }
  }
  println!();
  println!("Compression disabled for: {}", compression_disabled.join(", "));
  Ok(())
}
