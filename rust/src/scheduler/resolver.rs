//! Conflict resolution over an already-packed timeline.
//!
//! Each task is corrected using only its own times and the previous corrected
//! task:
//! 1. start before work start: clamp to work start on the same day
//! 2. end at or after the work-end hour: move to the next day's work start
//! 3. start before the previous task's end: push to previous end + gap

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::config::{ResolverConfig, WorkHours};
use crate::models::{ScheduledTask, Task, ValidationError};
use crate::{log_changes, log_checks};

use super::state::{day_start, next_work_day};

/// How hard the resolver works on each task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolveMode {
    /// Apply each rule once, in order.
    #[default]
    SinglePass,
    /// After an overlap push, re-apply the work-hour rules until the task no
    /// longer moves.
    Settle,
}

/// Correct start/end times of `tasks` in place.
///
/// Fails with [`ValidationError::Unscheduled`] before touching anything if
/// some task has no start time.
pub fn resolve<'t, I>(
    tasks: I,
    config: &ResolverConfig,
) -> Result<Vec<ScheduledTask>, ValidationError>
where
    I: IntoIterator<Item = &'t mut Task>,
{
    let mut tasks: Vec<&mut Task> = tasks.into_iter().collect();
    if let Some(task) = tasks.iter().find(|t| t.start_time.is_none()) {
        return Err(ValidationError::Unscheduled(task.id.clone()));
    }

    let verbosity = config.verbosity;
    let gap = Duration::minutes(i64::from(config.gap_minutes));
    let mut previous_end: Option<NaiveDateTime> = None;
    let mut resolved = Vec::with_capacity(tasks.len());

    for task in tasks.iter_mut() {
        let Some(original) = task.start_time else {
            continue;
        };
        let duration = task.duration_delta();

        let mut start = fit_work_hours(original, duration, config.work_hours, false);
        if let Some(prev_end) = previous_end {
            if start < prev_end {
                log_checks!(verbosity, "  {} overlaps previous task ending {}", task.id, prev_end);
                start = prev_end + gap;
                if config.mode == ResolveMode::Settle {
                    start = settle(start, duration, config.work_hours);
                }
            }
        }

        if start != original {
            log_changes!(verbosity, "Moved {} from {} to {}", task.id, original, start);
        }
        task.schedule_at(start);
        previous_end = Some(start + duration);

        if let Some(entry) = ScheduledTask::from_task(task) {
            resolved.push(entry);
        }
    }

    Ok(resolved)
}

/// Apply the two work-hour rules once.
///
/// With `keep_full_day`, a task already at the work-start instant is left in
/// place even if it ends late, since it cannot fit anywhere else either.
fn fit_work_hours(
    start: NaiveDateTime,
    duration: Duration,
    hours: WorkHours,
    keep_full_day: bool,
) -> NaiveDateTime {
    let mut start = start;
    if start.hour() < hours.start_hour {
        start = day_start(start.date(), hours.start_hour);
    }
    let day_begins = start == day_start(start.date(), hours.start_hour);
    if (start + duration).hour() >= hours.end_hour && !(keep_full_day && day_begins) {
        start = next_work_day(start, hours);
    }
    start
}

fn settle(start: NaiveDateTime, duration: Duration, hours: WorkHours) -> NaiveDateTime {
    let mut current = start;
    loop {
        let next = fit_work_hours(current, duration, hours, true);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn make_task(id: &str, start: NaiveDateTime, duration: u32) -> Task {
        let mut task = Task::new(id, id);
        task.duration = duration;
        task.schedule_at(start);
        task
    }

    fn starts(tasks: &[ScheduledTask]) -> Vec<NaiveDateTime> {
        tasks.iter().map(|t| t.start_time).collect()
    }

    fn settle_config() -> ResolverConfig {
        ResolverConfig {
            mode: ResolveMode::Settle,
            ..ResolverConfig::default()
        }
    }

    #[test]
    fn test_overlap_pushed_after_previous() {
        let mut tasks = vec![make_task("a", dt(6, 9, 0), 60), make_task("b", dt(6, 9, 30), 60)];
        let resolved = resolve(tasks.iter_mut(), &ResolverConfig::default()).unwrap();
        assert!(resolved[1].start_time >= dt(6, 10, 0));
        assert_eq!(resolved[1].start_time, dt(6, 10, 15));
        assert_eq!(tasks[1].end_time, Some(dt(6, 11, 15)));
    }

    #[test]
    fn test_early_start_clamped() {
        let mut tasks = vec![make_task("a", dt(6, 7, 30), 30)];
        let resolved = resolve(tasks.iter_mut(), &ResolverConfig::default()).unwrap();
        assert_eq!(starts(&resolved), vec![dt(6, 9, 0)]);
        assert_eq!(resolved[0].end_time, dt(6, 9, 30));
    }

    #[test]
    fn test_late_end_moves_to_next_morning() {
        let mut tasks = vec![make_task("a", dt(6, 17, 30), 60)];
        let resolved = resolve(tasks.iter_mut(), &ResolverConfig::default()).unwrap();
        assert_eq!(starts(&resolved), vec![dt(7, 9, 0)]);
    }

    #[test]
    fn test_end_exactly_at_work_end_moves() {
        let mut tasks = vec![make_task("a", dt(6, 17, 0), 60)];
        let resolved = resolve(tasks.iter_mut(), &ResolverConfig::default()).unwrap();
        assert_eq!(starts(&resolved), vec![dt(7, 9, 0)]);
    }

    #[test]
    fn test_valid_schedule_unchanged() {
        let mut tasks = vec![
            make_task("a", dt(6, 9, 0), 60),
            make_task("b", dt(6, 10, 15), 60),
            make_task("c", dt(6, 13, 0), 120),
        ];
        let before: Vec<_> = tasks.iter().map(|t| t.start_time).collect();
        resolve(tasks.iter_mut(), &ResolverConfig::default()).unwrap();
        let after: Vec<_> = tasks.iter().map(|t| t.start_time).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_single_pass_leaves_pushed_task_past_work_end() {
        let mut tasks = vec![
            make_task("a", dt(6, 9, 0), 480),
            make_task("b", dt(6, 16, 0), 60),
        ];
        let resolved = resolve(tasks.iter_mut(), &ResolverConfig::default()).unwrap();
        // b is pushed to 17:15 and ends 18:15; one pass does not recheck it
        assert_eq!(resolved[1].start_time, dt(6, 17, 15));
        assert_eq!(resolved[1].end_time, dt(6, 18, 15));
    }

    #[test]
    fn test_settle_rechecks_after_push() {
        let mut tasks = vec![
            make_task("a", dt(6, 9, 0), 480),
            make_task("b", dt(6, 16, 0), 60),
        ];
        let resolved = resolve(tasks.iter_mut(), &settle_config()).unwrap();
        assert_eq!(resolved[1].start_time, dt(7, 9, 0));
    }

    #[test]
    fn test_settle_clamps_push_into_early_morning() {
        // a runs overnight until 01:40, so b is pushed to 01:55
        let mut single = vec![make_task("a", dt(6, 9, 0), 1000), make_task("b", dt(6, 10, 0), 60)];
        let mut settled = single.clone();

        let resolved = resolve(single.iter_mut(), &ResolverConfig::default()).unwrap();
        assert_eq!(resolved[1].start_time, dt(7, 1, 55));

        let resolved = resolve(settled.iter_mut(), &settle_config()).unwrap();
        assert_eq!(resolved[1].start_time, dt(7, 9, 0));
    }

    #[test]
    fn test_settle_accepts_task_longer_than_window() {
        let mut tasks = vec![
            make_task("a", dt(6, 9, 0), 1000),
            make_task("huge", dt(6, 20, 0), 600),
        ];
        let resolved = resolve(tasks.iter_mut(), &settle_config()).unwrap();
        // clamped to 09:00, ends 19:00, and stays since no day can hold it
        assert_eq!(resolved[1].start_time, dt(7, 9, 0));
        assert_eq!(resolved[1].end_time, dt(7, 19, 0));
    }

    #[test]
    fn test_custom_gap() {
        let config = ResolverConfig {
            gap_minutes: 5,
            ..ResolverConfig::default()
        };
        let mut tasks = vec![make_task("a", dt(6, 9, 0), 60), make_task("b", dt(6, 9, 0), 30)];
        let resolved = resolve(tasks.iter_mut(), &config).unwrap();
        assert_eq!(resolved[1].start_time, dt(6, 10, 5));
    }

    #[test]
    fn test_unscheduled_task_fails_without_mutation() {
        let mut tasks = vec![make_task("a", dt(6, 7, 0), 60), Task::new("b", "b")];
        assert_eq!(
            resolve(tasks.iter_mut(), &ResolverConfig::default()),
            Err(ValidationError::Unscheduled("b".to_string()))
        );
        assert_eq!(tasks[0].start_time, Some(dt(6, 7, 0)));
    }
}
