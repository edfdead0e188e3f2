//! Core data types for the scheduling system.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Duration given to tasks created without one, in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Date-time formats accepted from text input, most specific first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Bad data rejected at the operation that introduced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task name must not be empty")]
    EmptyName,
    #[error("duration must be a positive number of minutes")]
    NonPositiveDuration,
    #[error("unknown priority '{0}': must be urgent, high, medium, or low")]
    UnknownPriority(String),
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },
    #[error("task {0} cannot depend on itself")]
    SelfDependency(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: String, value: String },
    #[error("task {0} has no start time to resolve")]
    Unscheduled(String),
}

/// One of the four fixed urgency classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Base urgency score of the tier.
    pub fn weight(self) -> f64 {
        match self {
            Self::Urgent => 1.0,
            Self::High => 0.8,
            Self::Medium => 0.5,
            Self::Low => 0.3,
        }
    }

    /// Position in urgency order (0 = most urgent).
    pub fn rank(self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ValidationError::UnknownPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

/// A task record. The same shape is used in memory and in snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Minutes; always positive in a valid store.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
}

impl Task {
    /// A task with creation defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            duration: DEFAULT_DURATION_MINUTES,
            priority: Priority::default(),
            deadline: None,
            dependencies: Vec::new(),
            tags: Vec::new(),
            completed: false,
            start_time: None,
            end_time: None,
        }
    }

    pub fn duration_delta(&self) -> Duration {
        Duration::minutes(i64::from(self.duration))
    }

    pub fn is_scheduled(&self) -> bool {
        self.start_time.is_some()
    }

    /// Place the task at `start`, keeping `end_time = start_time + duration`.
    pub fn schedule_at(&mut self, start: NaiveDateTime) {
        self.start_time = Some(start);
        self.end_time = Some(start + self.duration_delta());
    }

    pub fn clear_schedule(&mut self) {
        self.start_time = None;
        self.end_time = None;
    }

    /// Hours from `now` until the deadline; negative once it has passed.
    pub fn hours_until_deadline(&self, now: NaiveDateTime) -> Option<f64> {
        self.deadline
            .map(|deadline| (deadline - now).num_seconds() as f64 / 3600.0)
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.completed && self.deadline.is_some_and(|d| d < now)
    }
}

/// Fields for a task that does not exist yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub duration: u32,
    pub priority: Priority,
    pub deadline: Option<NaiveDateTime>,
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            duration: DEFAULT_DURATION_MINUTES,
            priority: Priority::default(),
            deadline: None,
            dependencies: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A single permitted field change.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Name(String),
    Description(String),
    Duration(u32),
    Priority(Priority),
    Deadline(Option<NaiveDateTime>),
    Dependencies(Vec<String>),
    Tags(Vec<String>),
    Completed(bool),
}

impl TaskUpdate {
    /// Parse a `key=value` style change. Unknown keys are rejected.
    ///
    /// List fields take comma-separated values; an empty value (or `none`)
    /// clears a deadline or list.
    pub fn parse(key: &str, value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidValue {
            field: key.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();
        match key.trim() {
            "name" => Ok(Self::Name(value.to_string())),
            "description" => Ok(Self::Description(value.to_string())),
            "duration" => value.parse().map(Self::Duration).map_err(|_| invalid()),
            "priority" => value.parse().map(Self::Priority),
            "deadline" => {
                if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    Ok(Self::Deadline(None))
                } else {
                    parse_datetime(value)
                        .map(|d| Self::Deadline(Some(d)))
                        .map_err(|_| invalid())
                }
            }
            "dependencies" => Ok(Self::Dependencies(split_list(value))),
            "tags" => Ok(Self::Tags(split_list(value))),
            "completed" => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Self::Completed(true)),
                "false" | "no" | "0" => Ok(Self::Completed(false)),
                _ => Err(invalid()),
            },
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    if value.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a user-supplied date-time (`YYYY-MM-DD HH:MM` or ISO-8601).
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, ValidationError> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "datetime".to_string(),
            value: s.to_string(),
        })
}

/// Collapse duplicates while keeping first-occurrence order.
pub(crate) fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = rustc_hash::FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// A task that has been placed on the timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration: u32,
}

impl ScheduledTask {
    /// Snapshot of a task's slot, if it has one.
    pub fn from_task(task: &Task) -> Option<Self> {
        let start_time = task.start_time?;
        Some(Self {
            task_id: task.id.clone(),
            name: task.name.clone(),
            start_time,
            end_time: task.end_time.unwrap_or(start_time + task.duration_delta()),
            duration: task.duration,
        })
    }
}
