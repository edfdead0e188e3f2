//! Task store: the single owner of all task records.
//!
//! Tasks are kept in insertion order, which is the tie-break order for the
//! dependency graph. Ids are `task_<n>` with `n` drawn from a counter that only
//! moves forward, so a deleted id is never handed out again.

use chrono::{Duration, NaiveDateTime};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::models::{dedup_preserving_order, NewTask, Priority, Task, TaskUpdate, ValidationError};

/// Prefix of every store-assigned id.
pub const ID_PREFIX: &str = "task_";

/// Format the id for counter value `n`.
pub fn format_task_id(n: u64) -> String {
    format!("{}{}", ID_PREFIX, n)
}

/// Numeric suffix of a `task_<n>` id.
pub fn parse_task_id(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Aggregate numbers over the whole store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Not completed and already started at the time of the query.
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
    /// Percentage in `[0, 100]`.
    pub completion_rate: f64,
    pub total_duration: u64,
    pub completed_duration: u64,
    pub avg_duration: f64,
}

/// Owned collection of tasks plus the id counter.
#[derive(Clone, Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: FxHashMap<String, usize>,
    next_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated tasks with an explicit counter.
    pub(crate) fn from_parts(tasks: Vec<Task>, next_id: u64) -> Self {
        let mut store = Self {
            tasks,
            index: FxHashMap::default(),
            next_id,
        };
        store.rebuild_index();
        store
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Counter value the next `add` will use.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Task, ValidationError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.tasks[i]),
            None => Err(ValidationError::TaskNotFound(id.to_string())),
        }
    }

    /// Mutable access to several tasks at once, in the order of `ids`.
    ///
    /// Unknown ids fail the whole call. Duplicate ids are yielded once.
    pub(crate) fn get_many_mut(
        &mut self,
        ids: &[String],
    ) -> Result<Vec<&mut Task>, ValidationError> {
        let mut positions: Vec<usize> = Vec::with_capacity(ids.len());
        let mut seen = rustc_hash::FxHashSet::default();
        for id in ids {
            let &pos = self
                .index
                .get(id)
                .ok_or_else(|| ValidationError::TaskNotFound(id.clone()))?;
            if seen.insert(pos) {
                positions.push(pos);
            }
        }

        let mut slots: Vec<Option<&mut Task>> = self.tasks.iter_mut().map(Some).collect();
        Ok(positions
            .into_iter()
            .filter_map(|pos| slots[pos].take())
            .collect())
    }

    fn check_dependencies(
        &self,
        task_id: Option<&str>,
        deps: &[String],
    ) -> Result<(), ValidationError> {
        for dep in deps {
            if Some(dep.as_str()) == task_id {
                return Err(ValidationError::SelfDependency(dep.clone()));
            }
            if !self.contains(dep) {
                return Err(ValidationError::UnknownDependency {
                    task: task_id.unwrap_or("<new>").to_string(),
                    dependency: dep.clone(),
                });
            }
        }
        Ok(())
    }

    /// Create a task, assigning the next id.
    ///
    /// Rejects an empty name, a zero duration, and dependencies that are not in
    /// the store. Nothing is changed when validation fails.
    pub fn add(&mut self, new_task: NewTask) -> Result<&Task, ValidationError> {
        if new_task.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if new_task.duration == 0 {
            return Err(ValidationError::NonPositiveDuration);
        }
        let dependencies = dedup_preserving_order(new_task.dependencies);
        self.check_dependencies(None, &dependencies)?;

        let id = format_task_id(self.next_id);
        self.next_id += 1;

        let mut task = Task::new(id.clone(), new_task.name);
        task.description = new_task.description;
        task.duration = new_task.duration;
        task.priority = new_task.priority;
        task.deadline = new_task.deadline;
        task.dependencies = dependencies;
        task.tags = dedup_preserving_order(new_task.tags);

        tracing::debug!(task_id = %id, "task added");
        self.index.insert(id, self.tasks.len());
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Apply field changes to one task.
    ///
    /// All changes are validated before any is applied.
    pub fn update(&mut self, id: &str, updates: Vec<TaskUpdate>) -> Result<&Task, ValidationError> {
        if !self.contains(id) {
            return Err(ValidationError::TaskNotFound(id.to_string()));
        }

        let mut updates = updates;
        for update in &mut updates {
            match update {
                TaskUpdate::Name(name) if name.trim().is_empty() => {
                    return Err(ValidationError::EmptyName)
                }
                TaskUpdate::Duration(0) => return Err(ValidationError::NonPositiveDuration),
                TaskUpdate::Dependencies(deps) => {
                    *deps = dedup_preserving_order(std::mem::take(deps));
                    self.check_dependencies(Some(id), deps)?;
                }
                TaskUpdate::Tags(tags) => {
                    *tags = dedup_preserving_order(std::mem::take(tags));
                }
                _ => {}
            }
        }

        let task = self.get_mut(id)?;
        for update in updates {
            match update {
                TaskUpdate::Name(name) => task.name = name,
                TaskUpdate::Description(description) => task.description = description,
                TaskUpdate::Duration(minutes) => {
                    task.duration = minutes;
                    if let Some(start) = task.start_time {
                        task.schedule_at(start);
                    }
                }
                TaskUpdate::Priority(priority) => task.priority = priority,
                TaskUpdate::Deadline(deadline) => task.deadline = deadline,
                TaskUpdate::Dependencies(deps) => task.dependencies = deps,
                TaskUpdate::Tags(tags) => task.tags = tags,
                TaskUpdate::Completed(completed) => task.completed = completed,
            }
        }
        tracing::debug!(task_id = %id, "task updated");
        Ok(&*task)
    }

    pub fn mark_completed(&mut self, id: &str) -> Result<(), ValidationError> {
        self.get_mut(id)?.completed = true;
        tracing::debug!(task_id = %id, "task completed");
        Ok(())
    }

    /// Remove a task. Dependents keep their (now dangling) reference, which the
    /// next scheduling pass reports.
    pub fn delete(&mut self, id: &str) -> Result<Task, ValidationError> {
        let pos = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| ValidationError::TaskNotFound(id.to_string()))?;
        let removed = self.tasks.remove(pos);
        self.rebuild_index();
        tracing::debug!(task_id = %id, "task deleted");
        Ok(removed)
    }

    /// Drop every task and reset the counter.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.index.clear();
        self.next_id = 0;
    }

    pub fn tasks_by_priority(&self, priority: Priority) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.priority == priority).collect()
    }

    /// Incomplete tasks whose deadline is before `now`.
    pub fn overdue_tasks(&self, now: NaiveDateTime) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_overdue(now)).collect()
    }

    /// Incomplete tasks with a deadline in `[now, now + hours]`.
    ///
    /// A horizon past the end of the calendar covers every later deadline.
    pub fn upcoming_tasks(&self, now: NaiveDateTime, hours: u32) -> Vec<&Task> {
        let horizon = Duration::try_hours(i64::from(hours))
            .and_then(|span| now.checked_add_signed(span))
            .unwrap_or(NaiveDateTime::MAX);
        self.tasks
            .iter()
            .filter(|t| !t.completed)
            .filter(|t| t.deadline.is_some_and(|d| now <= d && d <= horizon))
            .collect()
    }

    pub fn statistics(&self, now: NaiveDateTime) -> Statistics {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        let in_progress = self
            .tasks
            .iter()
            .filter(|t| !t.completed && t.start_time.is_some_and(|s| s <= now))
            .count();
        let total_duration: u64 = self.tasks.iter().map(|t| u64::from(t.duration)).sum();
        let completed_duration: u64 = self
            .tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| u64::from(t.duration))
            .sum();

        let (completion_rate, avg_duration) = if total > 0 {
            (
                completed as f64 / total as f64 * 100.0,
                total_duration as f64 / total as f64,
            )
        } else {
            (0.0, 0.0)
        };

        Statistics {
            total_tasks: total,
            completed_tasks: completed,
            in_progress_tasks: in_progress,
            pending_tasks: total - completed - in_progress,
            completion_rate,
            total_duration,
            completed_duration,
            avg_duration,
        }
    }
}
