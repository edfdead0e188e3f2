//! Packing cursor: the next instant a task may start.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::config::WorkHours;

/// `date` at `hour:00`.
pub fn day_start(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour))
}

/// Work-start instant on the calendar day after `at`.
pub fn next_work_day(at: NaiveDateTime, hours: WorkHours) -> NaiveDateTime {
    day_start(at.date(), hours.start_hour) + Duration::days(1)
}

/// Cursor state carried across one packing pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackCursor {
    at: NaiveDateTime,
    hours: WorkHours,
    gap: Duration,
}

impl PackCursor {
    /// Cursor at an explicit instant, used as given.
    pub fn new(at: NaiveDateTime, hours: WorkHours, gap_minutes: u32) -> Self {
        Self {
            at,
            hours,
            gap: Duration::minutes(i64::from(gap_minutes)),
        }
    }

    /// Cursor at `date` at the start of the work day.
    pub fn at_day_start(date: NaiveDate, hours: WorkHours, gap_minutes: u32) -> Self {
        Self::new(day_start(date, hours.start_hour), hours, gap_minutes)
    }

    pub fn position(&self) -> NaiveDateTime {
        self.at
    }

    /// Move past a task ending at `end`.
    ///
    /// The cursor lands at `end + gap`; if that falls at or after the work-end
    /// hour it rolls to the next day's work start. Returns `true` on rollover.
    pub fn advance_past(&mut self, end: NaiveDateTime) -> bool {
        self.at = end + self.gap;
        if self.at.hour() >= self.hours.end_hour {
            self.at = next_work_day(self.at, self.hours);
            return true;
        }
        false
    }
}
