//! Scheduler facade running the full optimize pipeline against a store.

use chrono::{Local, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::config::{ConfigError, SchedulingConfig};
use crate::graph::{dependency_order_with_verbosity, GraphError};
use crate::models::{ScheduledTask, ValidationError};
use crate::scoring::{rank_by_urgency, ScoringMode};
use crate::store::TaskStore;
use crate::{log_changes, log_debug};

use super::packer::TimelinePacker;
use super::resolver::{resolve, ResolveMode};

/// Errors that can occur during scheduling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Per-call options for [`Scheduler::optimize`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Day to start packing on; today (local) when unset.
    pub start_date: Option<NaiveDate>,
    /// Run the conflict resolver over the packed timeline.
    pub resolve_conflicts: bool,
    pub resolve_mode: ResolveMode,
}

impl OptimizeOptions {
    pub fn starting(start_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            ..Self::default()
        }
    }
}

/// Runs order -> pack -> (resolve) over a task store.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    config: SchedulingConfig,
}

impl Scheduler {
    pub fn new(config: SchedulingConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Dependency order of every task in the store.
    pub fn order(&self, store: &TaskStore) -> Result<Vec<String>, GraphError> {
        dependency_order_with_verbosity(store.tasks(), self.config.verbosity)
    }

    /// Assign start/end times to every incomplete task.
    ///
    /// The store is not modified when ordering fails (cycle or dangling
    /// dependency). Completed tasks keep whatever schedule they had.
    pub fn optimize(
        &self,
        store: &mut TaskStore,
        options: &OptimizeOptions,
    ) -> Result<Vec<ScheduledTask>, SchedulerError> {
        let verbosity = self.config.verbosity;
        let order = self.order(store)?;
        let start_date = options
            .start_date
            .unwrap_or_else(|| Local::now().date_naive());

        log_changes!(
            verbosity,
            "Optimizing {} tasks starting {}",
            order.len(),
            start_date
        );

        let packer = TimelinePacker::new(self.config.clone());
        let scheduled = packer.optimize(store.get_many_mut(&order)?, start_date);

        if !options.resolve_conflicts {
            return Ok(scheduled);
        }

        log_debug!(verbosity, "Resolving conflicts ({:?})", options.resolve_mode);
        let ids: Vec<String> = scheduled.into_iter().map(|s| s.task_id).collect();
        let resolver_config = self.config.resolver_config(options.resolve_mode);
        Ok(resolve(store.get_many_mut(&ids)?, &resolver_config)?)
    }

    /// Tasks ranked by urgency score, most urgent first.
    pub fn rank(
        &self,
        store: &TaskStore,
        current_time: NaiveDateTime,
        mode: ScoringMode,
    ) -> Vec<(String, f64)> {
        rank_by_urgency(store.tasks().iter().filter(|t| !t.completed), current_time, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, Priority, TaskUpdate};
    use chrono::{Duration, NaiveDate};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn dt(day: u32, h: u32, m: u32) -> NaiveDateTime {
        d(2025, 1, day).and_hms_opt(h, m, 0).unwrap()
    }

    fn options() -> OptimizeOptions {
        OptimizeOptions::starting(d(2025, 1, 6))
    }

    #[test]
    fn test_optimize_independent_tasks() {
        let mut store = TaskStore::new();
        for name in ["a", "b", "c"] {
            store.add(NewTask::new(name)).unwrap();
        }

        let scheduled = Scheduler::default().optimize(&mut store, &options()).unwrap();
        let slots: Vec<_> = scheduled.iter().map(|s| (s.start_time, s.end_time)).collect();
        assert_eq!(
            slots,
            vec![
                (dt(6, 9, 0), dt(6, 10, 0)),
                (dt(6, 10, 15), dt(6, 11, 15)),
                (dt(6, 11, 30), dt(6, 12, 30)),
            ]
        );
        assert_eq!(store.get("task_1").unwrap().start_time, Some(dt(6, 10, 15)));
    }

    #[test]
    fn test_dependencies_scheduled_first() {
        let mut store = TaskStore::new();
        store.add(NewTask::new("later")).unwrap();
        store.add(NewTask::new("first").duration(30)).unwrap();
        store
            .update("task_0", vec![TaskUpdate::Dependencies(vec!["task_1".into()])])
            .unwrap();

        let scheduled = Scheduler::default().optimize(&mut store, &options()).unwrap();
        let ids: Vec<&str> = scheduled.iter().map(|s| s.task_id.as_str()).collect();
        assert_eq!(ids, vec!["task_1", "task_0"]);

        let first = store.get("task_1").unwrap();
        let later = store.get("task_0").unwrap();
        assert!(first.end_time.unwrap() + Duration::minutes(15) <= later.start_time.unwrap());
    }

    #[test]
    fn test_cycle_leaves_store_untouched() {
        let mut store = TaskStore::new();
        store.add(NewTask::new("a")).unwrap();
        store.add(NewTask::new("b").depends_on("task_0")).unwrap();
        store
            .update("task_0", vec![TaskUpdate::Dependencies(vec!["task_1".into()])])
            .unwrap();

        let result = Scheduler::default().optimize(&mut store, &options());
        assert_eq!(
            result,
            Err(SchedulerError::Graph(GraphError::Cycle(vec![
                "task_0".to_string(),
                "task_1".to_string()
            ])))
        );
        assert!(store.tasks().iter().all(|t| t.start_time.is_none()));
    }

    #[test]
    fn test_dangling_dependency_after_delete() {
        let mut store = TaskStore::new();
        store.add(NewTask::new("a")).unwrap();
        store.add(NewTask::new("b").depends_on("task_0")).unwrap();
        store.delete("task_0").unwrap();

        let result = Scheduler::default().optimize(&mut store, &options());
        assert!(matches!(
            result,
            Err(SchedulerError::Graph(GraphError::Invalid(
                ValidationError::UnknownDependency { .. }
            )))
        ));
    }

    #[test]
    fn test_completed_tasks_keep_their_slot() {
        let mut store = TaskStore::new();
        store.add(NewTask::new("a")).unwrap();
        store.add(NewTask::new("b")).unwrap();
        let scheduler = Scheduler::default();
        scheduler.optimize(&mut store, &options()).unwrap();
        store.mark_completed("task_0").unwrap();

        let next_week = OptimizeOptions::starting(d(2025, 1, 13));
        let scheduled = scheduler.optimize(&mut store, &next_week).unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(store.get("task_0").unwrap().start_time, Some(dt(6, 9, 0)));
        assert_eq!(store.get("task_1").unwrap().start_time, Some(dt(13, 9, 0)));
    }

    #[test]
    fn test_optimize_with_resolver() {
        let mut store = TaskStore::new();
        store.add(NewTask::new("long").duration(480)).unwrap();
        store.add(NewTask::new("short").duration(60)).unwrap();

        let opts = OptimizeOptions {
            resolve_conflicts: true,
            resolve_mode: ResolveMode::Settle,
            ..options()
        };
        let scheduled = Scheduler::default().optimize(&mut store, &opts).unwrap();
        // packed 09:00-17:00 then 17:15-18:15; the resolver moves short to the next morning
        assert_eq!(scheduled[1].start_time, dt(7, 9, 0));
        assert_eq!(store.get("task_1").unwrap().start_time, Some(dt(7, 9, 0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulingConfig {
            work_start_hour: 18,
            work_end_hour: 9,
            ..SchedulingConfig::default()
        };
        assert!(matches!(
            Scheduler::new(config),
            Err(SchedulerError::Config(ConfigError::InvalidWorkHours { .. }))
        ));
    }

    #[test]
    fn test_rank_skips_completed() {
        let mut store = TaskStore::new();
        store.add(NewTask::new("low").priority(Priority::Low)).unwrap();
        store.add(NewTask::new("urgent").priority(Priority::Urgent)).unwrap();
        store.add(NewTask::new("done").priority(Priority::Urgent)).unwrap();
        store.mark_completed("task_2").unwrap();

        let ranked = Scheduler::default().rank(&store, dt(6, 9, 0), ScoringMode::Basic);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["task_1", "task_0"]);
    }
}
