//! File-backed key-value store: one `<key>.json` file per key.
//!
//! # Invariants
//! - Writes go to a sibling temp file first and are renamed into place, so
//!   readers see either the previous or the new value.

use super::{ensure_valid_key, KeyValueStore, StoreResult};
use log::{debug, warn};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const VALUE_FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Opens a store rooted at `root`, creating the directory when missing.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(
            "event=store_open module=store status=ok backend=file root={}",
            root.display()
        );
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{VALUE_FILE_EXTENSION}"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        ensure_valid_key(key)?;
        match fs::read_to_string(self.value_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        ensure_valid_key(key)?;
        let target = self.value_path(key);
        let staging = self.root.join(format!(".{key}.{VALUE_FILE_EXTENSION}.tmp"));

        if let Err(err) = write_staged(&staging, &target, value) {
            if let Err(cleanup) = fs::remove_file(&staging) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(
                        "event=store_write module=store status=error backend=file error_code=staging_cleanup_failed error={cleanup}"
                    );
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        ensure_valid_key(key)?;
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn write_staged(staging: &Path, target: &Path, value: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(staging)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(staging, target)
}

#[cfg(test)]
mod tests {
    use super::FileKeyValueStore;
    use crate::store::KeyValueStore;
    use std::fs;

    #[test]
    fn failed_write_removes_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        fs::create_dir(dir.path().join("blocked.json")).unwrap();

        assert!(store.set("blocked", "[]").is_err());
        assert!(!dir.path().join(".blocked.json.tmp").exists());
    }

    #[test]
    fn successful_write_leaves_only_value_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();

        store.set("todos-v1", "[]").unwrap();

        let names = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["todos-v1.json".to_string()]);
    }
}
