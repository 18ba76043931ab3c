//! Task repository contract and key-value implementation.
//!
//! # Invariants
//! - `save` always writes the full ordered collection.
//! - `load` treats an absent key and unreadable text alike: empty result.
//! - Records that fail to decode are skipped, remaining order is kept.

use crate::model::task::Task;
use crate::store::KeyValueStore;
use log::{debug, error, warn};

/// Default key holding the serialized task collection.
pub const DEFAULT_STORAGE_KEY: &str = "todos-v1";

/// Swappable persistence contract consumed by `TaskService`.
pub trait TaskRepository {
    /// Persists the full collection. Returns `false` on any failure.
    fn save(&self, tasks: &[Task]) -> bool;
    /// Loads the full collection, or an empty one when nothing usable exists.
    fn load(&self) -> Vec<Task>;
    /// Removes the persisted collection. Returns `false` on failure.
    fn clear(&self) -> bool;
}

impl<R: TaskRepository + ?Sized> TaskRepository for Box<R> {
    fn save(&self, tasks: &[Task]) -> bool {
        (**self).save(tasks)
    }

    fn load(&self) -> Vec<Task> {
        (**self).load()
    }

    fn clear(&self) -> bool {
        (**self).clear()
    }
}

/// Repository storing the collection as a JSON array under one key.
pub struct KeyValueTaskRepository<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> KeyValueTaskRepository<S> {
    /// Creates a repository writing under [`DEFAULT_STORAGE_KEY`].
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> TaskRepository for KeyValueTaskRepository<S> {
    fn save(&self, tasks: &[Task]) -> bool {
        let encoded = match serde_json::to_string(tasks) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(
                    "event=tasks_save module=repo status=error key={} error_code=encode_failed error={err}",
                    self.key
                );
                return false;
            }
        };

        match self.store.set(&self.key, &encoded) {
            Ok(()) => {
                debug!(
                    "event=tasks_save module=repo status=ok key={} count={} bytes={}",
                    self.key,
                    tasks.len(),
                    encoded.len()
                );
                true
            }
            Err(err) => {
                error!(
                    "event=tasks_save module=repo status=error key={} error_code=write_failed error={err}",
                    self.key
                );
                false
            }
        }
    }

    fn load(&self) -> Vec<Task> {
        let text = match self.store.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("event=tasks_load module=repo status=empty key={}", self.key);
                return Vec::new();
            }
            Err(err) => {
                error!(
                    "event=tasks_load module=repo status=error key={} error_code=read_failed error={err}",
                    self.key
                );
                return Vec::new();
            }
        };

        let records = match serde_json::from_str::<Vec<serde_json::Value>>(&text) {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "event=tasks_load module=repo status=error key={} error_code=parse_failed error={err}",
                    self.key
                );
                return Vec::new();
            }
        };

        let total = records.len();
        let tasks = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match Task::from_record(record) {
                Ok(task) => Some(task),
                Err(err) => {
                    warn!(
                        "event=tasks_load module=repo status=skip key={} index={index} error={err}",
                        self.key
                    );
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "event=tasks_load module=repo status=ok key={} count={} skipped={}",
            self.key,
            tasks.len(),
            total - tasks.len()
        );
        tasks
    }

    fn clear(&self) -> bool {
        match self.store.remove(&self.key) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=tasks_clear module=repo status=error key={} error={err}",
                    self.key
                );
                false
            }
        }
    }
}
