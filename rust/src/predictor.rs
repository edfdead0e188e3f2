//! Duration prediction from recorded actual durations.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io;
use std::path::Path;

use crate::models::{ValidationError, DEFAULT_DURATION_MINUTES};
use crate::persistence::{write_atomic, PersistenceError};

/// Samples kept per task name.
pub const HISTORY_WINDOW: usize = 10;

/// Persisted form: sorted so the same history always encodes the same bytes.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    samples: BTreeMap<String, Vec<u32>>,
}

/// Predicts a task's duration from the last few actual durations recorded
/// under the same name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DurationPredictor {
    history: FxHashMap<String, VecDeque<u32>>,
}

impl DurationPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one actual duration in minutes, dropping the oldest sample once
    /// the window is full.
    pub fn record(&mut self, task_name: &str, actual_minutes: u32) -> Result<(), ValidationError> {
        if actual_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration);
        }
        let samples = self.history.entry(task_name.to_string()).or_default();
        samples.push_back(actual_minutes);
        while samples.len() > HISTORY_WINDOW {
            samples.pop_front();
        }
        Ok(())
    }

    /// Truncated mean of the recorded samples, or `default` with no history.
    pub fn predict(&self, task_name: &str, default: u32) -> u32 {
        match self.history.get(task_name) {
            Some(samples) if !samples.is_empty() => {
                let total: u64 = samples.iter().map(|&m| u64::from(m)).sum();
                // mean of u32 values always fits in u32
                u32::try_from(total / samples.len() as u64).unwrap_or(u32::MAX)
            }
            _ => default,
        }
    }

    /// [`predict`](Self::predict) with the creation-default duration.
    pub fn predict_or_default(&self, task_name: &str) -> u32 {
        self.predict(task_name, DEFAULT_DURATION_MINUTES)
    }

    /// Recorded samples for a name, oldest first.
    pub fn samples(&self, task_name: &str) -> Vec<u32> {
        self.history
            .get(task_name)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let file = HistoryFile {
            samples: self
                .history
                .iter()
                .map(|(name, samples)| (name.clone(), samples.iter().copied().collect()))
                .collect(),
        };
        let bytes = postcard::to_allocvec(&file).map_err(|source| PersistenceError::History {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &bytes)
    }

    /// Load history from `path`. A missing file yields an empty predictor.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let file: HistoryFile =
            postcard::from_bytes(&bytes).map_err(|source| PersistenceError::History {
                path: path.to_path_buf(),
                source,
            })?;

        let history = file
            .samples
            .into_iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(name, samples)| {
                let skip = samples.len().saturating_sub(HISTORY_WINDOW);
                (name, samples.into_iter().skip(skip).collect())
            })
            .collect();
        Ok(Self { history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mean_of_samples() {
        let mut predictor = DurationPredictor::new();
        for minutes in [50, 55, 60] {
            predictor.record("standup", minutes).unwrap();
        }
        assert_eq!(predictor.predict("standup", 60), 55);
    }

    #[test]
    fn test_mean_is_truncated() {
        let mut predictor = DurationPredictor::new();
        predictor.record("review", 10).unwrap();
        predictor.record("review", 11).unwrap();
        assert_eq!(predictor.predict("review", 60), 10);
    }

    #[test]
    fn test_no_history_uses_default() {
        let predictor = DurationPredictor::new();
        assert_eq!(predictor.predict("anything", 60), 60);
        assert_eq!(predictor.predict("anything", 25), 25);
        assert_eq!(predictor.predict_or_default("anything"), DEFAULT_DURATION_MINUTES);
    }

    #[test]
    fn test_window_keeps_last_ten() {
        let mut predictor = DurationPredictor::new();
        for minutes in 1..=15 {
            predictor.record("t", minutes).unwrap();
        }
        assert_eq!(predictor.samples("t"), (6..=15).collect::<Vec<u32>>());
        // (6 + ... + 15) / 10 = 10.5
        assert_eq!(predictor.predict("t", 60), 10);
    }

    #[test]
    fn test_zero_rejected() {
        let mut predictor = DurationPredictor::new();
        assert_eq!(
            predictor.record("t", 0),
            Err(ValidationError::NonPositiveDuration)
        );
        assert!(predictor.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.bin");

        let mut predictor = DurationPredictor::new();
        predictor.record("standup", 15).unwrap();
        predictor.record("standup", 20).unwrap();
        predictor.record("deploy", 45).unwrap();
        predictor.save(&path).unwrap();

        let loaded = DurationPredictor::load(&path).unwrap();
        assert_eq!(loaded, predictor);
        assert_eq!(loaded.predict("standup", 60), 17);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = DurationPredictor::load(&dir.path().join("nope.bin")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.bin");
        let garbage = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        fs::write(&path, garbage).unwrap();
        assert!(matches!(
            DurationPredictor::load(&path),
            Err(PersistenceError::History { .. })
        ));
    }
}
