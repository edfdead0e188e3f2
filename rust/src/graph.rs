//! Dependency graph ordering.
//!
//! Edges run from a dependency to the tasks that wait on it. Ordering uses
//! Kahn's algorithm with a FIFO ready queue seeded in input order, so ties are
//! always broken by insertion order and repeated calls agree.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use thiserror::Error;

use crate::log_debug;
use crate::models::{Task, ValidationError};

/// Errors that can occur while ordering tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// No linear order exists; lists the tasks left unresolved, in input order.
    #[error("circular dependency detected among tasks: {}", .0.join(", "))]
    Cycle(Vec<String>),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Map of task id -> ids of the tasks that depend on it.
pub type DependentsMap<'a> = FxHashMap<&'a str, Vec<&'a str>>;

/// Build the dependency -> dependents adjacency list.
///
/// Dependents are listed in input order. Duplicate dependency entries on a
/// task produce a single edge.
pub fn build_dependents_map(tasks: &[Task]) -> DependentsMap<'_> {
    let mut dependents: DependentsMap<'_> =
        FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
    for task in tasks {
        for dep in unique_dependencies(task) {
            dependents.entry(dep).or_default().push(task.id.as_str());
        }
    }
    dependents
}

fn unique_dependencies(task: &Task) -> impl Iterator<Item = &str> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    task.dependencies
        .iter()
        .map(String::as_str)
        .filter(move |dep| seen.insert(*dep))
}

/// Check that every dependency names a task in the set.
pub fn validate_dependencies(tasks: &[Task]) -> Result<(), ValidationError> {
    let ids: FxHashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    for task in tasks {
        if let Some(missing) = task
            .dependencies
            .iter()
            .find(|dep| !ids.contains(dep.as_str()))
        {
            return Err(ValidationError::UnknownDependency {
                task: task.id.clone(),
                dependency: missing.clone(),
            });
        }
    }
    Ok(())
}

/// Order tasks so every task comes after all of its dependencies.
///
/// # Returns
/// * `Ok(ids)` - a permutation of all task ids
/// * `Err(GraphError::Invalid)` - a dependency names a task not in `tasks`
/// * `Err(GraphError::Cycle)` - the graph has at least one cycle
pub fn dependency_order(tasks: &[Task]) -> Result<Vec<String>, GraphError> {
    dependency_order_with_verbosity(tasks, 0)
}

pub(crate) fn dependency_order_with_verbosity(
    tasks: &[Task],
    verbosity: u8,
) -> Result<Vec<String>, GraphError> {
    validate_dependencies(tasks)?;

    let dependents = build_dependents_map(tasks);

    // In-degree is the size of each task's own dependency set
    let mut in_degree: FxHashMap<&str, usize> = tasks
        .iter()
        .map(|t| (t.id.as_str(), unique_dependencies(t).count()))
        .collect();

    let mut queue: VecDeque<&str> = tasks
        .iter()
        .map(|t| t.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    log_debug!(
        verbosity,
        "Dependency graph: {} tasks, {} initially ready",
        tasks.len(),
        queue.len()
    );

    let mut result: Vec<String> = Vec::with_capacity(tasks.len());

    while let Some(task_id) = queue.pop_front() {
        result.push(task_id.to_string());

        let Some(waiting) = dependents.get(task_id) else {
            continue;
        };
        for &dependent in waiting {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    log_debug!(verbosity, "  {} ready after {}", dependent, task_id);
                    queue.push_back(dependent);
                }
            }
        }
    }

    if result.len() != tasks.len() {
        let unresolved = tasks
            .iter()
            .filter(|t| in_degree.get(t.id.as_str()).is_some_and(|&d| d > 0))
            .map(|t| t.id.clone())
            .collect();
        return Err(GraphError::Cycle(unresolved));
    }

    Ok(result)
}
