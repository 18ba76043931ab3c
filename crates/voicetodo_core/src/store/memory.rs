//! In-memory key-value store, optionally bounded by a byte quota.

use super::{ensure_valid_key, KeyValueStore, StoreError, StoreResult};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Process-local store used by tests and the `memory` storage backend.
///
/// The quota counts key plus value bytes across all entries, like browser
/// storage quotas do.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes growing it past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RefCell::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        ensure_valid_key(key)?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        ensure_valid_key(key)?;
        let mut entries = self.entries.borrow_mut();

        if let Some(quota_bytes) = self.quota_bytes {
            let others = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum::<usize>();
            let required_bytes = others + key.len() + value.len();
            if required_bytes > quota_bytes {
                return Err(StoreError::QuotaExceeded {
                    quota_bytes,
                    required_bytes,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        ensure_valid_key(key)?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
