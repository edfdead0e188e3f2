//! JSON snapshots of the task store.
//!
//! Writes are atomic: the snapshot goes to a temp file in the target directory
//! which is then renamed over the destination. Imports are all or nothing.

use chrono::{Local, NaiveDateTime};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::Task;
use crate::store::{parse_task_id, TaskStore};

/// Errors reading or writing persisted state.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed snapshot {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode snapshot for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}: task id '{id}' does not follow task_<integer>", .path.display())]
    InvalidId { path: PathBuf, id: String },
    #[error("{}: duplicate task id '{id}'", .path.display())]
    DuplicateId { path: PathBuf, id: String },
    #[error("{}: task {id}: {reason}", .path.display())]
    InvalidTask {
        path: PathBuf,
        id: String,
        reason: String,
    },
    #[error("corrupt history file {}: {source}", .path.display())]
    History {
        path: PathBuf,
        #[source]
        source: postcard::Error,
    },
}

/// On-disk shape of an exported store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub exported_at: NaiveDateTime,
}

impl Snapshot {
    /// Capture the store as of local now.
    pub fn of(store: &TaskStore) -> Self {
        Self {
            tasks: store.tasks().to_vec(),
            exported_at: Local::now().naive_local(),
        }
    }

    /// Validate the records and build a store with the recovered counter.
    ///
    /// `path` is only used for error context.
    pub fn into_store(self, path: &Path) -> Result<TaskStore, PersistenceError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut max_suffix: Option<u64> = None;

        for task in &self.tasks {
            let suffix = parse_task_id(&task.id).ok_or_else(|| PersistenceError::InvalidId {
                path: path.to_path_buf(),
                id: task.id.clone(),
            })?;
            if !seen.insert(task.id.as_str()) {
                return Err(PersistenceError::DuplicateId {
                    path: path.to_path_buf(),
                    id: task.id.clone(),
                });
            }
            if let Some(reason) = record_problem(task) {
                return Err(PersistenceError::InvalidTask {
                    path: path.to_path_buf(),
                    id: task.id.clone(),
                    reason: reason.to_string(),
                });
            }
            max_suffix = max_suffix.max(Some(suffix));
        }

        let next_id = max_suffix.map_or(0, |n| n + 1);
        Ok(TaskStore::from_parts(self.tasks, next_id))
    }
}

fn record_problem(task: &Task) -> Option<&'static str> {
    if task.name.trim().is_empty() {
        return Some("name must not be empty");
    }
    if task.duration == 0 {
        return Some("duration must be positive");
    }
    match (task.start_time, task.end_time) {
        (None, Some(_)) => Some("end_time set without start_time"),
        (Some(start), Some(end)) if end != start + task.duration_delta() => {
            Some("end_time does not equal start_time + duration")
        }
        _ => None,
    }
}

/// Write `contents` to `path` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let write_err = |source: io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Export the whole store as pretty-printed JSON.
pub fn export_to_path(store: &TaskStore, path: &Path) -> Result<(), PersistenceError> {
    let snapshot = Snapshot::of(store);
    let mut json =
        serde_json::to_vec_pretty(&snapshot).map_err(|source| PersistenceError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    json.push(b'\n');
    write_atomic(path, &json)?;
    tracing::debug!(path = %path.display(), tasks = snapshot.tasks.len(), "exported snapshot");
    Ok(())
}

/// Read and validate a snapshot file into a fresh store.
pub fn read_snapshot(path: &Path) -> Result<TaskStore, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: Snapshot =
        serde_json::from_str(&text).map_err(|source| PersistenceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    snapshot.into_store(path)
}

/// Replace `store` with the contents of `path`.
///
/// On any error `store` is left exactly as it was. Returns the number of
/// imported tasks.
pub fn import_from_path(store: &mut TaskStore, path: &Path) -> Result<usize, PersistenceError> {
    let imported = read_snapshot(path)?;
    let count = imported.len();
    *store = imported;
    tracing::debug!(path = %path.display(), tasks = count, "imported snapshot");
    Ok(count)
}

/// Load the store kept at `path`, or an empty one if the file does not exist.
pub fn load_or_default(path: &Path) -> Result<TaskStore, PersistenceError> {
    if !path.exists() {
        return Ok(TaskStore::new());
    }
    read_snapshot(path)
}
