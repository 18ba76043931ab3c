//! Host key-value storage abstraction.
//!
//! # Responsibility
//! - Provide a synchronous text key-value store contract that the task
//!   persistence adapter writes through.
//! - Ship memory, file and SQLite implementations of that contract.
//!
//! # Invariants
//! - Keys are validated before touching any backend, so file-backed keys
//!   can never escape their root directory.
//! - Removing a key that does not exist succeeds.

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod file;
mod memory;
mod sqlite;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

static STORAGE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("valid storage key regex"));

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage backend failure.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Db(DbError),
    /// Write would grow the store past its byte quota.
    QuotaExceeded { quota_bytes: usize, required_bytes: usize },
    InvalidKey(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "storage io error: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded {
                quota_bytes,
                required_bytes,
            } => write!(
                f,
                "storage quota exceeded: {required_bytes} bytes required, {quota_bytes} allowed"
            ),
            Self::InvalidKey(key) => write!(f, "invalid storage key: `{key}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::InvalidKey(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous text key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// Returns whether `key` is accepted by every backend.
pub fn is_valid_storage_key(key: &str) -> bool {
    STORAGE_KEY_RE.is_match(key)
}

pub(crate) fn ensure_valid_key(key: &str) -> StoreResult<()> {
    if is_valid_storage_key(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_storage_key;

    #[test]
    fn storage_keys_reject_path_segments() {
        assert!(is_valid_storage_key("todos-v1"));
        assert!(is_valid_storage_key("backup.2026_10"));
        assert!(!is_valid_storage_key(""));
        assert!(!is_valid_storage_key("../escape"));
        assert!(!is_valid_storage_key("nested/key"));
        assert!(!is_valid_storage_key(&"k".repeat(65)));
    }
}
