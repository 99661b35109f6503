//! Task graph engine.
//!
//! Tasks run as soon as all of their dependencies have completed, up to the
//! configured parallelism. Each task in the requested closure runs at most
//! once. The first failure stops dispatch: tasks that have not started are
//! skipped, tasks already running finish and have their outcome recorded.

pub mod dag;
pub mod types;

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use petgraph::graph::NodeIndex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::ReleaseError;

pub use dag::{TaskGraph, TaskGraphBuilder};
pub use types::{ExecuteConfig, GraphError, RunReport, SkipReason, TaskAction, TaskFuture, action};

enum Outcome {
  Finished(Result<(), ReleaseError>),
  NotStarted,
}

/// Run the named tasks and their transitive dependencies.
///
/// Returns `Err` only when a root is unknown; task failures are reported in
/// the [`RunReport`].
pub async fn run_tasks<C, S>(
  graph: &TaskGraph<C>,
  roots: &[S],
  ctx: Arc<C>,
  config: &ExecuteConfig,
) -> Result<RunReport, GraphError>
where
  C: Send + Sync + 'static,
  S: AsRef<str>,
{
  let closure = graph.closure(roots)?;
  info!(tasks = closure.len(), parallelism = config.parallelism, "starting task execution");

  let mut waiting: HashMap<NodeIndex, usize> = closure
    .iter()
    .map(|&idx| (idx, graph.predecessors_in(idx, &closure).len()))
    .collect();
  let mut initial: Vec<NodeIndex> = waiting.iter().filter(|(_, n)| **n == 0).map(|(idx, _)| *idx).collect();
  initial.sort();
  let mut ready: VecDeque<NodeIndex> = initial.into();

  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
  let abort = Arc::new(AtomicBool::new(false));
  let mut join_set = JoinSet::new();
  let mut report = RunReport::default();
  let mut completed: HashSet<NodeIndex> = HashSet::new();
  let mut failed: HashSet<NodeIndex> = HashSet::new();

  loop {
    while !abort.load(Ordering::SeqCst) {
      let Some(idx) = ready.pop_front() else { break };
      let node = graph.node(idx);

      let Some(task_action) = node.action.clone() else {
        debug!(task = %node.name, "barrier reached");
        completed.insert(idx);
        report.completed.push(node.name.clone());
        release(graph, idx, &mut waiting, &mut ready);
        continue;
      };

      let name = node.name.clone();
      let ctx = ctx.clone();
      let semaphore = semaphore.clone();
      let abort = abort.clone();

      join_set.spawn(async move {
        let Ok(_permit) = semaphore.acquire_owned().await else {
          return (idx, Outcome::NotStarted);
        };
        if abort.load(Ordering::SeqCst) {
          return (idx, Outcome::NotStarted);
        }

        info!(task = %name, "task started");
        let result = match AssertUnwindSafe(task_action(ctx)).catch_unwind().await {
          Ok(result) => result,
          Err(_) => Err(GraphError::Panicked(name).into()),
        };
        if result.is_err() {
          abort.store(true, Ordering::SeqCst);
        }
        (idx, Outcome::Finished(result))
      });
    }

    let Some(joined) = join_set.join_next().await else { break };

    match joined {
      Ok((idx, Outcome::Finished(Ok(())))) => {
        let name = graph.node(idx).name.clone();
        info!(task = %name, "task completed");
        completed.insert(idx);
        report.completed.push(name);
        if !abort.load(Ordering::SeqCst) {
          release(graph, idx, &mut waiting, &mut ready);
        }
      }
      Ok((idx, Outcome::Finished(Err(e)))) => {
        let name = graph.node(idx).name.clone();
        error!(task = %name, error = %e, "task failed");
        failed.insert(idx);
        if report.failed.is_none() {
          report.failed = Some((name, e));
        } else {
          report.additional_failures.push((name, e));
        }
        abort.store(true, Ordering::SeqCst);
      }
      Ok((_, Outcome::NotStarted)) => {}
      Err(e) => {
        error!(error = %e, "task join failed");
        abort.store(true, Ordering::SeqCst);
      }
    }
  }

  // Everything in the closure that neither completed nor failed was skipped
  let mut failed_root: HashMap<NodeIndex, String> = HashMap::new();
  for idx in graph.topological(&closure)? {
    let name = &graph.node(idx).name;
    if failed.contains(&idx) {
      failed_root.insert(idx, name.clone());
      continue;
    }
    if completed.contains(&idx) {
      continue;
    }

    let reason = graph
      .predecessors_in(idx, &closure)
      .iter()
      .find_map(|dep| failed_root.get(dep).cloned())
      .map(SkipReason::FailedDependency)
      .unwrap_or(SkipReason::Aborted);
    if let SkipReason::FailedDependency(root) = &reason {
      failed_root.insert(idx, root.clone());
    }

    warn!(task = %name, reason = %reason, "skipping task");
    report.skipped.insert(name.clone(), reason);
  }

  // A closure member left behind with no failure to blame is still a failed run
  if let Some(name) = report.skipped.keys().next().filter(|_| report.failed.is_none()).cloned() {
    error!(task = %name, "task never ran");
    report.failed = Some((name.clone(), GraphError::NotRun(name).into()));
  }

  info!(
    completed = report.completed.len(),
    failed = report.failed.is_some(),
    skipped = report.skipped.len(),
    "task execution complete"
  );

  Ok(report)
}

/// Mark `idx` done and queue any dependents that became ready.
fn release<C>(
  graph: &TaskGraph<C>,
  idx: NodeIndex,
  waiting: &mut HashMap<NodeIndex, usize>,
  ready: &mut VecDeque<NodeIndex>,
) {
  for dependent in graph.dependent_indices(idx) {
    if let Some(count) = waiting.get_mut(&dependent) {
      *count = count.saturating_sub(1);
      if *count == 0 {
        ready.push_back(dependent);
      }
    }
  }
}
