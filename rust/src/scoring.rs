//! Urgency scoring for tasks.
//!
//! Two variants share one formula:
//! - `Basic`: tier weight + deadline proximity bonus
//! - `Detailed`: as `Basic`, minus a small penalty per dependency
//!
//! Scores are clamped to `[0, 2]`. Placement order on the timeline comes from
//! the dependency graph, never from these scores.

use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::models::{Priority, Task};

/// Lowest possible score.
pub const MIN_SCORE: f64 = 0.0;
/// Highest possible score.
pub const MAX_SCORE: f64 = 2.0;
/// Penalty per dependency in the detailed variant.
pub const DEPENDENCY_PENALTY: f64 = 0.05;
/// Weight used for a tier label that is not recognised.
pub const FALLBACK_WEIGHT: f64 = 0.5;

/// Which scoring variant to apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScoringMode {
    #[default]
    Basic,
    /// Subtracts [`DEPENDENCY_PENALTY`] per dependency.
    Detailed,
}

/// Tier weight for a raw label; unknown labels score as medium.
pub fn weight_for_label(label: &str) -> f64 {
    label
        .parse::<Priority>()
        .map(Priority::weight)
        .unwrap_or(FALLBACK_WEIGHT)
}

/// Bonus for a deadline `hours` away (negative = already passed).
pub fn deadline_bonus(hours: f64) -> f64 {
    if hours < 24.0 {
        0.5
    } else if hours < 48.0 {
        0.3
    } else if hours < 72.0 {
        0.1
    } else {
        0.0
    }
}

/// Compute a task's urgency score at `current_time`.
pub fn score(task: &Task, current_time: NaiveDateTime, mode: ScoringMode) -> f64 {
    score_components(
        task.priority.weight(),
        task.hours_until_deadline(current_time),
        task.dependencies.len(),
        mode,
    )
}

/// The scoring formula over its raw inputs.
pub fn score_components(
    tier_weight: f64,
    hours_until_deadline: Option<f64>,
    dependency_count: usize,
    mode: ScoringMode,
) -> f64 {
    let mut score = tier_weight;

    if let Some(hours) = hours_until_deadline {
        score += deadline_bonus(hours);
    }

    if mode == ScoringMode::Detailed {
        score -= dependency_count as f64 * DEPENDENCY_PENALTY;
    }

    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Sort key for urgency ranking.
///
/// Implements `Ord` so that lower = more urgent: higher score first, then
/// tier, then earliest deadline (tasks with one before tasks without), then
/// input position.
#[derive(Debug, Clone, PartialEq)]
pub struct UrgencyKey {
    neg_score: f64,
    tier_rank: u8,
    deadline: Option<NaiveDateTime>,
    position: usize,
}

impl UrgencyKey {
    pub fn new(
        task: &Task,
        position: usize,
        current_time: NaiveDateTime,
        mode: ScoringMode,
    ) -> Self {
        Self {
            neg_score: -score(task, current_time, mode),
            tier_rank: task.priority.rank(),
            deadline: task.deadline,
            position,
        }
    }

    pub fn score(&self) -> f64 {
        -self.neg_score
    }
}

/// Compare f64 values for sorting, treating NaN as equal.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn cmp_deadline(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Eq for UrgencyKey {}

impl Ord for UrgencyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_f64(self.neg_score, other.neg_score)
            .then(self.tier_rank.cmp(&other.tier_rank))
            .then(cmp_deadline(self.deadline, other.deadline))
            .then(self.position.cmp(&other.position))
    }
}

impl PartialOrd for UrgencyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Rank tasks by urgency, most urgent first.
///
/// Returns `(task_id, score)` pairs. Completed tasks are included; callers
/// filter them if they want to.
pub fn rank_by_urgency<'a, I>(
    tasks: I,
    current_time: NaiveDateTime,
    mode: ScoringMode,
) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut keyed: Vec<(UrgencyKey, &Task)> = tasks
        .into_iter()
        .enumerate()
        .map(|(position, task)| (UrgencyKey::new(task, position, current_time, mode), task))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

    keyed
        .into_iter()
        .map(|(key, task)| (task.id.clone(), key.score()))
        .collect()
}
