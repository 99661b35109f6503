//! Task dependency graph.
//!
//! Tasks are registered explicitly with their dependencies and an optional
//! action, then frozen into a [`TaskGraph`] that is validated for duplicate
//! names, dangling dependencies and cycles before anything executes.
//!
//! Besides hard dependencies a task may be ordered after another without
//! pulling it in: the ordering only applies when both end up in the same run.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::types::{GraphError, TaskAction};

/// A registered task.
pub(crate) struct TaskNode<C> {
  pub name: String,
  pub dependencies: Vec<String>,
  /// `None` for a pure grouping node.
  pub action: Option<TaskAction<C>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
  /// The dependent needs the dependency and pulls it into the run.
  Requires,
  /// Ordering only, honored when both tasks are scheduled.
  After,
}

/// Collects task registrations before validation.
pub struct TaskGraphBuilder<C> {
  tasks: Vec<TaskNode<C>>,
  /// `(task, predecessor)` pairs.
  orderings: Vec<(String, String)>,
}

impl<C> Default for TaskGraphBuilder<C> {
  fn default() -> Self {
    Self {
      tasks: Vec::new(),
      orderings: Vec::new(),
    }
  }
}

impl<C> TaskGraphBuilder<C> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a task. A task without an action is a barrier that completes as
  /// soon as its dependencies have.
  pub fn register<I, S>(&mut self, name: impl Into<String>, dependencies: I, action: Option<TaskAction<C>>) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut unique: Vec<String> = Vec::new();
    for dependency in dependencies {
      let dependency = dependency.into();
      if !unique.contains(&dependency) {
        unique.push(dependency);
      }
    }

    self.tasks.push(TaskNode {
      name: name.into(),
      dependencies: unique,
      action,
    });
    self
  }

  /// Order `task` after `predecessor` whenever both run, without making
  /// `predecessor` a dependency.
  pub fn must_run_after(&mut self, task: impl Into<String>, predecessor: impl Into<String>) -> &mut Self {
    self.orderings.push((task.into(), predecessor.into()));
    self
  }

  /// Validate the registrations and freeze them into a graph.
  pub fn build(self) -> Result<TaskGraph<C>, GraphError> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for task in self.tasks {
      if nodes.contains_key(&task.name) {
        return Err(GraphError::DuplicateTask(task.name));
      }
      let name = task.name.clone();
      let idx = graph.add_node(task);
      nodes.insert(name, idx);
    }

    // Edges run from dependency to dependent
    let indices: Vec<NodeIndex> = graph.node_indices().collect();
    for idx in indices {
      let dependencies = graph[idx].dependencies.clone();
      for dependency in dependencies {
        let Some(&dep_idx) = nodes.get(&dependency) else {
          return Err(GraphError::UnknownDependency {
            task: graph[idx].name.clone(),
            dependency,
          });
        };
        graph.update_edge(dep_idx, idx, Edge::Requires);
      }
    }

    for (task, predecessor) in self.orderings {
      let Some(&idx) = nodes.get(&task) else {
        return Err(GraphError::UnknownTask(task));
      };
      let Some(&pred_idx) = nodes.get(&predecessor) else {
        return Err(GraphError::UnknownDependency {
          task,
          dependency: predecessor,
        });
      };
      if graph.find_edge(pred_idx, idx).is_none() {
        graph.add_edge(pred_idx, idx, Edge::After);
      }
    }

    toposort(&graph, None).map_err(|cycle| GraphError::CycleDetected(graph[cycle.node_id()].name.clone()))?;

    Ok(TaskGraph { graph, nodes })
  }
}

/// A validated, acyclic set of tasks.
pub struct TaskGraph<C> {
  graph: DiGraph<TaskNode<C>, Edge>,
  nodes: HashMap<String, NodeIndex>,
}

impl<C> TaskGraph<C> {
  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn contains(&self, name: &str) -> bool {
    self.nodes.contains_key(name)
  }

  /// Task names in registration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.graph.node_indices().map(|idx| self.graph[idx].name.as_str())
  }

  /// Declared dependencies of a task, in declaration order.
  pub fn dependencies(&self, name: &str) -> Option<&[String]> {
    self.nodes.get(name).map(|&idx| self.graph[idx].dependencies.as_slice())
  }

  /// Whether a task performs work, as opposed to being a barrier.
  pub fn has_action(&self, name: &str) -> bool {
    self
      .nodes
      .get(name)
      .is_some_and(|&idx| self.graph[idx].action.is_some())
  }

  pub(crate) fn node(&self, idx: NodeIndex) -> &TaskNode<C> {
    &self.graph[idx]
  }

  /// Tasks in `closure` that must finish before `idx` starts.
  pub(crate) fn predecessors_in(&self, idx: NodeIndex, closure: &HashSet<NodeIndex>) -> Vec<NodeIndex> {
    let mut predecessors: Vec<NodeIndex> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .filter(|pred| closure.contains(pred))
      .collect();
    predecessors.sort();
    predecessors.dedup();
    predecessors
  }

  /// Dependents of a task, in registration order.
  pub(crate) fn dependent_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
    let mut dependents: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
    dependents.sort();
    dependents.dedup();
    dependents
  }

  /// The named tasks plus all of their transitive dependencies.
  pub(crate) fn closure<S: AsRef<str>>(&self, roots: &[S]) -> Result<HashSet<NodeIndex>, GraphError> {
    let mut closure = HashSet::new();
    let mut stack = Vec::new();

    for root in roots {
      let root = root.as_ref();
      let &idx = self
        .nodes
        .get(root)
        .ok_or_else(|| GraphError::UnknownTask(root.to_string()))?;
      stack.push(idx);
    }

    while let Some(idx) = stack.pop() {
      if closure.insert(idx) {
        stack.extend(
          self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|edge| *edge.weight() == Edge::Requires)
            .map(|edge| edge.source()),
        );
      }
    }

    Ok(closure)
  }

  /// Closure members in an order where dependencies come before dependents.
  pub(crate) fn topological(&self, closure: &HashSet<NodeIndex>) -> Result<Vec<NodeIndex>, GraphError> {
    let sorted = toposort(&self.graph, None)
      .map_err(|cycle| GraphError::CycleDetected(self.graph[cycle.node_id()].name.clone()))?;
    Ok(sorted.into_iter().filter(|idx| closure.contains(idx)).collect())
  }

  /// Group the closure of `roots` into waves of tasks whose dependencies are
  /// all in earlier waves.
  pub fn plan<S: AsRef<str>>(&self, roots: &[S]) -> Result<Vec<Vec<String>>, GraphError> {
    let closure = self.closure(roots)?;

    let mut in_degree: HashMap<NodeIndex, usize> = closure
      .iter()
      .map(|&idx| (idx, self.predecessors_in(idx, &closure).len()))
      .collect();
    let mut remaining = closure;
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let mut wave: Vec<NodeIndex> = remaining
        .iter()
        .filter(|idx| in_degree.get(idx) == Some(&0))
        .copied()
        .collect();

      if wave.is_empty() {
        // Unreachable for a validated graph
        let name = remaining
          .iter()
          .min()
          .map(|&idx| self.graph[idx].name.clone())
          .unwrap_or_default();
        return Err(GraphError::CycleDetected(name));
      }

      wave.sort();
      for idx in &wave {
        remaining.remove(idx);
        for dependent in self.dependent_indices(*idx) {
          if let Some(degree) = in_degree.get_mut(&dependent) {
            *degree = degree.saturating_sub(1);
          }
        }
      }

      waves.push(wave.into_iter().map(|idx| self.graph[idx].name.clone()).collect());
    }

    Ok(waves)
  }
}
