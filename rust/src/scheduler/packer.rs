//! Greedy timeline packing.

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::SchedulingConfig;
use crate::models::{ScheduledTask, Task};
use crate::{log_changes, log_checks};

use super::state::PackCursor;

/// Lays tasks end to end inside work hours, in the order given.
///
/// One forward pass; earlier placements are never revisited. A task longer
/// than the work window starts at the cursor and simply runs past the work-end
/// hour. Only the cursor is moved back into hours.
#[derive(Clone, Debug, Default)]
pub struct TimelinePacker {
    config: SchedulingConfig,
}

impl TimelinePacker {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Pack starting at `start_date` at the work-start hour.
    pub fn optimize<'t, I>(&self, tasks: I, start_date: NaiveDate) -> Vec<ScheduledTask>
    where
        I: IntoIterator<Item = &'t mut Task>,
    {
        let cursor = PackCursor::at_day_start(
            start_date,
            self.config.work_hours(),
            self.config.gap_minutes,
        );
        self.pack(tasks, cursor)
    }

    /// Pack starting at an explicit instant.
    pub fn pack_from<'t, I>(&self, tasks: I, start: NaiveDateTime) -> Vec<ScheduledTask>
    where
        I: IntoIterator<Item = &'t mut Task>,
    {
        let cursor = PackCursor::new(start, self.config.work_hours(), self.config.gap_minutes);
        self.pack(tasks, cursor)
    }

    fn pack<'t, I>(&self, tasks: I, mut cursor: PackCursor) -> Vec<ScheduledTask>
    where
        I: IntoIterator<Item = &'t mut Task>,
    {
        let verbosity = self.config.verbosity;
        let mut scheduled = Vec::new();

        for task in tasks {
            if task.completed {
                log_checks!(verbosity, "  Skipping completed task {}", task.id);
                continue;
            }

            task.schedule_at(cursor.position());
            let Some(entry) = ScheduledTask::from_task(task) else {
                continue;
            };
            log_changes!(
                verbosity,
                "Scheduled {} ({}) {} - {}",
                entry.task_id,
                entry.name,
                entry.start_time,
                entry.end_time
            );

            if cursor.advance_past(entry.end_time) {
                log_checks!(verbosity, "  Rolled over to {}", cursor.position());
            }
            scheduled.push(entry);
        }

        scheduled
    }
}
