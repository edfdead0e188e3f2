//! Python bindings.

use chrono::{Local, NaiveDate, NaiveDateTime};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::PathBuf;

use crate::config::SchedulingConfig;
use crate::models::{NewTask, Priority, ScheduledTask};
use crate::persistence::{self, PersistenceError};
use crate::predictor::DurationPredictor;
use crate::scheduler::{OptimizeOptions, ResolveMode, Scheduler};
use crate::scoring::{score_components, weight_for_label, ScoringMode};
use crate::store::TaskStore;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn io_error(e: PersistenceError) -> PyErr {
    PyIOError::new_err(e.to_string())
}

/// Task store with its scheduling configuration.
#[pyclass(name = "TaskStore")]
pub struct PyTaskStore {
    inner: TaskStore,
    scheduler: Scheduler,
}

#[pymethods]
impl PyTaskStore {
    #[new]
    #[pyo3(signature = (
        work_start_hour=None,
        work_end_hour=None,
        gap_minutes=None,
        verbosity=None
    ))]
    fn new(
        work_start_hour: Option<u32>,
        work_end_hour: Option<u32>,
        gap_minutes: Option<u32>,
        verbosity: Option<u8>,
    ) -> PyResult<Self> {
        let config = SchedulingConfig::new(work_start_hour, work_end_hour, gap_minutes, verbosity)
            .map_err(value_error)?;
        Ok(Self {
            inner: TaskStore::new(),
            scheduler: Scheduler::new(config).map_err(value_error)?,
        })
    }

    /// Add a task and return its id.
    #[pyo3(signature = (
        name,
        description="",
        duration=60,
        priority="medium",
        deadline=None,
        dependencies=None,
        tags=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn add_task(
        &mut self,
        name: String,
        description: &str,
        duration: u32,
        priority: &str,
        deadline: Option<NaiveDateTime>,
        dependencies: Option<Vec<String>>,
        tags: Option<Vec<String>>,
    ) -> PyResult<String> {
        let priority: Priority = priority.parse().map_err(value_error)?;
        let mut new_task = NewTask::new(name)
            .description(description)
            .duration(duration)
            .priority(priority);
        new_task.deadline = deadline;
        new_task.dependencies = dependencies.unwrap_or_default();
        new_task.tags = tags.unwrap_or_default();

        let task = self.inner.add(new_task).map_err(value_error)?;
        Ok(task.id.clone())
    }

    fn mark_completed(&mut self, task_id: &str) -> PyResult<()> {
        self.inner.mark_completed(task_id).map_err(value_error)
    }

    fn delete_task(&mut self, task_id: &str) -> PyResult<()> {
        self.inner.delete(task_id).map(|_| ()).map_err(value_error)
    }

    /// Schedule all open tasks; returns `(task_id, start, end)` tuples.
    #[pyo3(signature = (start_date=None, resolve_conflicts=false, settle=false))]
    fn optimize(
        &mut self,
        start_date: Option<NaiveDate>,
        resolve_conflicts: bool,
        settle: bool,
    ) -> PyResult<Vec<(String, NaiveDateTime, NaiveDateTime)>> {
        let options = OptimizeOptions {
            start_date,
            resolve_conflicts,
            resolve_mode: if settle {
                ResolveMode::Settle
            } else {
                ResolveMode::SinglePass
            },
        };
        let scheduled = self
            .scheduler
            .optimize(&mut self.inner, &options)
            .map_err(value_error)?;
        Ok(scheduled
            .into_iter()
            .map(|ScheduledTask { task_id, start_time, end_time, .. }| {
                (task_id, start_time, end_time)
            })
            .collect())
    }

    fn statistics<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let stats = self.inner.statistics(Local::now().naive_local());
        let dict = PyDict::new_bound(py);
        dict.set_item("total_tasks", stats.total_tasks)?;
        dict.set_item("completed_tasks", stats.completed_tasks)?;
        dict.set_item("in_progress_tasks", stats.in_progress_tasks)?;
        dict.set_item("pending_tasks", stats.pending_tasks)?;
        dict.set_item("completion_rate", stats.completion_rate)?;
        dict.set_item("total_duration", stats.total_duration)?;
        dict.set_item("completed_duration", stats.completed_duration)?;
        dict.set_item("avg_duration", stats.avg_duration)?;
        Ok(dict)
    }

    fn export_json(&self, path: PathBuf) -> PyResult<()> {
        persistence::export_to_path(&self.inner, &path).map_err(io_error)
    }

    /// Replace all tasks from a snapshot; returns the number imported.
    fn import_json(&mut self, path: PathBuf) -> PyResult<usize> {
        persistence::import_from_path(&mut self.inner, &path).map_err(io_error)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("TaskStore(tasks={}, next_id={})", self.inner.len(), self.inner.next_id())
    }
}

/// Urgency score for a raw priority label.
///
/// Unknown labels score as medium.
#[pyfunction]
#[pyo3(signature = (priority, hours_until_deadline=None, dependency_count=0, detailed=false))]
fn score_task(
    priority: &str,
    hours_until_deadline: Option<f64>,
    dependency_count: usize,
    detailed: bool,
) -> f64 {
    let mode = if detailed {
        ScoringMode::Detailed
    } else {
        ScoringMode::Basic
    };
    score_components(
        weight_for_label(priority),
        hours_until_deadline,
        dependency_count,
        mode,
    )
}

#[pyclass(name = "DurationPredictor")]
#[derive(Default)]
pub struct PyDurationPredictor {
    inner: DurationPredictor,
}

#[pymethods]
impl PyDurationPredictor {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, task_name: &str, actual_duration: u32) -> PyResult<()> {
        self.inner
            .record(task_name, actual_duration)
            .map_err(value_error)
    }

    #[pyo3(signature = (task_name, default=60))]
    fn predict(&self, task_name: &str, default: u32) -> u32 {
        self.inner.predict(task_name, default)
    }

    fn save(&self, path: PathBuf) -> PyResult<()> {
        self.inner.save(&path).map_err(io_error)
    }

    #[staticmethod]
    fn load(path: PathBuf) -> PyResult<Self> {
        Ok(Self {
            inner: DurationPredictor::load(&path).map_err(io_error)?,
        })
    }
}

pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTaskStore>()?;
    m.add_class::<PyDurationPredictor>()?;
    m.add_function(wrap_pyfunction!(score_task, m)?)?;
    Ok(())
}
