//! Core domain logic for voicetodo.
//! This crate is the single source of truth for task invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod speech;
pub mod store;

pub use config::{
    open_repository, ConfigError, CoreConfig, LoggingConfig, StorageBackend, StorageConfig,
};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::task::{Task, TaskId, TaskRecordError, Timestamp};
pub use model::validation::{validate_title, TitleValidationError, MAX_TITLE_CHARS};
pub use repo::task_repo::{KeyValueTaskRepository, TaskRepository, DEFAULT_STORAGE_KEY};
pub use service::board::TaskBoard;
pub use service::task_service::{
    PersistencePolicy, TaskService, TaskServiceError, TaskServiceResult,
};
pub use speech::{
    CaptureOutcome, CaptureState, ListenStart, SpeechCapture, SpeechEngine, SpeechError,
    SpeechSettings, UnavailableEngine,
};
pub use store::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError,
    StoreResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
