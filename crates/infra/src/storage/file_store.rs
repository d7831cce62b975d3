//! Credential persistence in a JSON file
//!
//! The whole map is rewritten on every change: written to a temporary file
//! in the same directory, then renamed over the target. A crash mid-write
//! leaves the previous file intact. Temporary files are created with
//! owner-only permissions, which the rename preserves.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use lessonlink_core::KeyValueStore;
use lessonlink_domain::{LessonLinkError, Result};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Key-value store backed by a JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store, reading the file if it exists
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and treated as empty; it is replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns [`LessonLinkError::Storage`] if the parent directory cannot be
    /// created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| LessonLinkError::from(InfraError::from(err)))?;
        }

        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring unreadable credential file");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened credential file");

        Ok(Self { path, entries: Mutex::new(entries) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let encoded = serde_json::to_vec_pretty(entries).map_err(storage_error)?;
        let mut file = NamedTempFile::new_in(dir).map_err(storage_error)?;
        file.write_all(&encoded).map_err(storage_error)?;
        file.as_file().sync_all().map_err(storage_error)?;
        file.persist(&self.path).map_err(|err| storage_error(err.error))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(storage_error),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(storage_error(err)),
    }
}

fn storage_error<E>(err: E) -> LessonLinkError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lessonlink_core::CredentialStore;
    use lessonlink_domain::Session;
    use tempfile::TempDir;

    use super::*;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("auth").join("credentials.json")
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        let store = JsonFileStore::open(&path).unwrap();
        store.set("lessonlink.auth.access_token", "A1").unwrap();
        store.set("theme", "dark").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("lessonlink.auth.access_token").unwrap().as_deref(), Some("A1"));
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();

        store.remove("absent").unwrap();
        assert!(!store.path().exists());

        store.set("key", "value").unwrap();
        store.remove("key").unwrap();
        assert_eq!(store.get("key").unwrap(), None);
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "{}");
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let store = JsonFileStore::open(&path).unwrap();
        for index in 0..5 {
            store.set("counter", &index.to_string()).unwrap();
        }

        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials.json")]);
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);

        store.set("key", "value").unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("key").unwrap().as_deref(), Some("value"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();
        store.set("key", "value").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_credential_store_restores_from_file() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        let backend = Arc::new(JsonFileStore::open(&path).unwrap());
        let store = CredentialStore::new(backend, "lessonlink.auth");
        store.establish(
            Session::authenticated("A1", Some("R1".into()), None),
            Some(serde_json::json!({"email": "a@b.com"})),
        );

        let restored =
            CredentialStore::restore(Arc::new(JsonFileStore::open(&path).unwrap()), "lessonlink.auth");
        assert_eq!(restored.get().access_token(), Some("A1"));
        assert_eq!(restored.get().refresh_token(), Some("R1"));
        assert_eq!(restored.user(), Some(serde_json::json!({"email": "a@b.com"})));

        restored.clear();
        let cleared =
            CredentialStore::restore(Arc::new(JsonFileStore::open(&path).unwrap()), "lessonlink.auth");
        assert!(!cleared.is_authenticated());
    }
}
