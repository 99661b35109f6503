//! Types for task registration and execution.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::error::ReleaseError;

/// Future returned by a task action.
pub type TaskFuture = BoxFuture<'static, Result<(), ReleaseError>>;

/// Work performed by a task. Every invocation receives the shared run context.
pub type TaskAction<C> = Arc<dyn Fn(Arc<C>) -> TaskFuture + Send + Sync>;

/// Wrap an async closure as a [`TaskAction`].
pub fn action<C, F, Fut>(f: F) -> TaskAction<C>
where
  F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), ReleaseError>> + Send + 'static,
{
  Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Errors in the shape of the task graph or its invocation.
#[derive(Debug, Error)]
pub enum GraphError {
  #[error("task registered twice: {0}")]
  DuplicateTask(String),

  #[error("task {task} depends on unknown task {dependency}")]
  UnknownDependency { task: String, dependency: String },

  #[error("unknown task: {0}")]
  UnknownTask(String),

  #[error("dependency cycle detected involving {0}")]
  CycleDetected(String),

  #[error("task {0} panicked")]
  Panicked(String),

  #[error("task {0} never ran")]
  NotRun(String),
}

/// Why a task in the requested closure did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  /// A transitive dependency failed.
  FailedDependency(String),
  /// Dispatch stopped after another task failed.
  Aborted,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::FailedDependency(task) => write!(f, "dependency {task} failed"),
      Self::Aborted => write!(f, "aborted"),
    }
  }
}

/// Outcome of running a set of tasks.
#[derive(Debug, Default)]
pub struct RunReport {
  /// Tasks that finished successfully, in completion order.
  pub completed: Vec<String>,

  /// The first failure observed.
  pub failed: Option<(String, ReleaseError)>,

  /// Failures of tasks that were already in flight when the first one failed.
  pub additional_failures: Vec<(String, ReleaseError)>,

  pub skipped: BTreeMap<String, SkipReason>,
}

impl RunReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_none()
  }

  pub fn is_completed(&self, task: &str) -> bool {
    self.completed.iter().any(|t| t == task)
  }

  /// Convert into a result carrying the first failure, if any.
  pub fn into_result(self) -> Result<Vec<String>, (String, ReleaseError)> {
    match self.failed {
      Some(failure) => Err(failure),
      None => Ok(self.completed),
    }
  }
}

/// Configuration for task execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of task actions running at once.
  pub parallelism: usize,
}

impl ExecuteConfig {
  /// `0` selects the host's available parallelism.
  pub fn with_parallelism(parallelism: usize) -> Self {
    if parallelism == 0 {
      Self::default()
    } else {
      Self { parallelism }
    }
  }
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
    }
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
