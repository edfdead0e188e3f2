//! Personal task scheduler.
//!
//! Tasks live in a [`TaskStore`]. [`Scheduler::optimize`] orders them by
//! dependency, packs them onto a work-hours calendar and optionally resolves
//! conflicts. Urgency ranking, JSON snapshots and duration prediction sit
//! alongside.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod cli;
pub mod config;
pub mod graph;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod predictor;
pub mod scheduler;
pub mod scoring;
pub mod store;

#[cfg(feature = "python")]
mod python;

pub use config::{ConfigError, ResolverConfig, SchedulingConfig, WorkHours};
pub use graph::{dependency_order, GraphError};
pub use models::{NewTask, Priority, ScheduledTask, Task, TaskUpdate, ValidationError};
pub use persistence::{export_to_path, import_from_path, PersistenceError, Snapshot};
pub use predictor::DurationPredictor;
pub use scheduler::{
    resolve, OptimizeOptions, ResolveMode, Scheduler, SchedulerError, TimelinePacker,
};
pub use scoring::{rank_by_urgency, score, ScoringMode};
pub use store::{Statistics, TaskStore};

/// The tasksched Python module.
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn tasksched(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    python::register(m)
}
