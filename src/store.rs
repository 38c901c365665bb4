//! Key-value persistence for client-side state.
//!
//! The chat client keeps two independent entries: the credential and the serialized
//! transcript.  [`KeyValueStore`] is the seam between the session and wherever those
//! entries live; [`FileStore`] keeps one file per key under a data directory and
//! [`MemoryStore`] keeps them in a map for tests.
//!
//! Writes unconditionally overwrite the previous value.  There is a single writer, so
//! no locking is done.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Store key holding the raw credential string.
pub const CREDENTIAL_KEY: &str = "chat-api-key";

/// Store key holding the JSON-serialized transcript.
pub const TRANSCRIPT_KEY: &str = "chat-messages";

/// A synchronous string key-value store.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing what was there.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`.  Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

////////////////////////////////////////// MemoryStore /////////////////////////////////////////

/// An in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns true if `key` has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/////////////////////////////////////////// FileStore //////////////////////////////////////////

/// A store that keeps each key in its own file under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            Error::io(
                format!("failed to create data directory {}", root.display()),
                err,
            )
        })?;
        Ok(Self { root })
    }

    /// The directory holding the entries.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(Error::validation(
                format!("invalid store key {key:?}"),
                Some("key".to_string()),
            ));
        }
        Ok(self.root.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(format!("failed to read {}", path.display()), err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Stage in the same directory so the persist is a rename, never a copy.
        let mut staged = NamedTempFile::new_in(&self.root).map_err(|err| {
            Error::io(format!("failed to stage {}", path.display()), err)
        })?;
        staged
            .write_all(value.as_bytes())
            .and_then(|()| staged.as_file_mut().sync_all())
            .map_err(|err| Error::io(format!("failed to write {}", path.display()), err))?;
        staged
            .persist(&path)
            .map_err(|err| Error::io(format!("failed to replace {}", path.display()), err.error))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(format!("failed to remove {}", path.display()), err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);

        store.set(CREDENTIAL_KEY, "abc123").unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("abc123"));

        store.set(CREDENTIAL_KEY, "def456").unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("def456"));

        store.remove(CREDENTIAL_KEY).unwrap();
        assert!(!store.contains(CREDENTIAL_KEY));
        store.remove(CREDENTIAL_KEY).unwrap();
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.set(TRANSCRIPT_KEY, "[]").unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(TRANSCRIPT_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn file_store_overwrite_leaves_only_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.set(TRANSCRIPT_KEY, "[]").unwrap();
        store
            .set(TRANSCRIPT_KEY, r#"[{"role":"user","content":"Hello"}]"#)
            .unwrap();
        store.set(CREDENTIAL_KEY, "abc123").unwrap();

        let mut names = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec![CREDENTIAL_KEY, TRANSCRIPT_KEY]);
        assert_eq!(
            store.get(TRANSCRIPT_KEY).unwrap().as_deref(),
            Some(r#"[{"role":"user","content":"Hello"}]"#)
        );
    }

    #[test]
    fn file_store_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("nested")).unwrap();
        store.set(CREDENTIAL_KEY, "abc123").unwrap();
        store.remove(CREDENTIAL_KEY).unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
        store.remove(CREDENTIAL_KEY).unwrap();
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert!(store.set("../escape", "x").unwrap_err().is_validation());
        assert!(store.get("").unwrap_err().is_validation());
        assert!(store.remove(".hidden").unwrap_err().is_validation());
    }
}
