//! Core configuration.
//!
//! # Responsibility
//! - Describe storage, logging, speech and persistence settings in one
//!   serde-backed document.
//! - Build the configured task repository.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object parses, and passes
//!   validation once the file backend has a `storage.path`.
//! - `validate()` runs on every load path before values are used.

use crate::logging::{default_log_level, normalize_level};
use crate::repo::task_repo::{KeyValueTaskRepository, TaskRepository, DEFAULT_STORAGE_KEY};
use crate::service::task_service::PersistencePolicy;
use crate::speech::SpeechSettings;
use crate::store::{
    is_valid_storage_key, FileKeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore,
    StoreResult,
};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

static LOCALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid locale regex")
});

const MAX_RETRY_DELAY_MS: u64 = 5_000;
const SQLITE_FILE_NAME: &str = "voicetodo.sqlite3";
const SQLITE_FILE_EXTENSIONS: &[&str] = &["sqlite3", "sqlite", "db"];

/// Storage medium behind the task repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Key holding the serialized collection.
    pub key: String,
    /// Directory (file backend) or database file (sqlite backend).
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            key: DEFAULT_STORAGE_KEY.to_string(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory. File logging stays off when unset.
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub speech: SpeechSettings,
    pub persistence: PersistencePolicy,
}

/// Configuration load or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        info!(
            "event=config_load module=config status=ok path={} backend={:?}",
            path.display(),
            config.storage.backend
        );
        Ok(config)
    }

    /// Checks cross-field constraints not expressed by the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_storage_key(&self.storage.key) {
            return Err(invalid(
                "storage.key",
                format!(
                    "`{}` must be 1-64 chars of [A-Za-z0-9._-]",
                    self.storage.key
                ),
            ));
        }
        if self.storage.backend != StorageBackend::Memory && self.storage.path.is_none() {
            return Err(invalid(
                "storage.path",
                "required for file and sqlite backends".to_string(),
            ));
        }
        normalize_level(&self.logging.level).map_err(|message| invalid("logging.level", message))?;
        if let Some(dir) = &self.logging.dir {
            if !Path::new(dir.trim()).is_absolute() {
                return Err(invalid(
                    "logging.dir",
                    format!("must be an absolute path, got `{dir}`"),
                ));
            }
        }
        if !LOCALE_RE.is_match(&self.speech.locale) {
            return Err(invalid(
                "speech.locale",
                format!("`{}` is not a language tag", self.speech.locale),
            ));
        }
        if self.speech.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(invalid(
                "speech.retry_delay_ms",
                format!("must be <= {MAX_RETRY_DELAY_MS}"),
            ));
        }
        Ok(())
    }
}

/// Builds the task repository described by `config`.
///
/// A file backend path is a directory. A sqlite backend path ending in
/// `.sqlite3`, `.sqlite` or `.db` is the database file; any other path is a
/// directory that receives `voicetodo.sqlite3`. Missing directories are
/// created.
pub fn open_repository(config: &StorageConfig) -> StoreResult<Box<dyn TaskRepository + Send>> {
    let key = config.key.clone();
    let repo: Box<dyn TaskRepository + Send> = match (config.backend, config.path.as_deref()) {
        (StorageBackend::Memory, _) => Box::new(KeyValueTaskRepository::with_key(
            MemoryKeyValueStore::new(),
            key,
        )),
        (backend, None) => {
            warn!(
                "event=repo_open module=config status=fallback backend={backend:?} reason=missing_path"
            );
            Box::new(KeyValueTaskRepository::with_key(
                MemoryKeyValueStore::new(),
                key,
            ))
        }
        (StorageBackend::File, Some(path)) => Box::new(KeyValueTaskRepository::with_key(
            FileKeyValueStore::open(path)?,
            key,
        )),
        (StorageBackend::Sqlite, Some(path)) => {
            let db_path = prepare_sqlite_path(path)?;
            Box::new(KeyValueTaskRepository::with_key(
                SqliteKeyValueStore::open(db_path)?,
                key,
            ))
        }
    };
    info!(
        "event=repo_open module=config status=ok backend={:?} key={}",
        config.backend, config.key
    );
    Ok(repo)
}

fn prepare_sqlite_path(path: &Path) -> std::io::Result<PathBuf> {
    let is_db_file = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SQLITE_FILE_EXTENSIONS.contains(&ext));
    if is_db_file {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        return Ok(path.to_path_buf());
    }
    std::fs::create_dir_all(path)?;
    Ok(path.join(SQLITE_FILE_NAME))
}

fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { field, message }
}
