//! Persisted record of when each repository was last updated.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::{debug, error};

use crate::error::{Error, Result};

/// Repository path → Unix time of its last successful update.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusStore {
    entries: BTreeMap<String, i64>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the store from `path`. A missing file is an empty store; anything
    /// else that goes wrong is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no status file at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(Error::status_io(path, e)),
        };

        serde_json::from_str(&contents).map_err(|source| Error::StatusFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrites `path` with the store as JSON indented by four spaces.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut json, formatter);
        self.serialize(&mut ser).map_err(|source| Error::StatusFormat {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| Error::status_io(path, e))
    }

    pub fn last_updated(&self, repo: &Path) -> Option<i64> {
        self.entries.get(&key(repo)).copied()
    }

    pub fn record(&mut self, repo: &Path, timestamp: i64) {
        self.entries.insert(key(repo), timestamp);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Keys are the lossy UTF-8 form of the path, so two paths differing only in
/// invalid bytes would share an entry. `RepoIter` never yields such paths.
fn key(repo: &Path) -> String {
    repo.to_string_lossy().into_owned()
}

/// Owns a [`StatusStore`] for the length of a run and writes it back exactly
/// once: through [`StatusGuard::persist`] on the normal path, or on drop when
/// the run bails out early or panics.
#[derive(Debug)]
pub struct StatusGuard {
    store: StatusStore,
    path: PathBuf,
    persisted: bool,
}

impl StatusGuard {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = StatusStore::load(&path)?;
        Ok(Self {
            store,
            path,
            persisted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn persist(mut self) -> Result<()> {
        self.persisted = true;
        self.store.save(&self.path)
    }
}

impl Deref for StatusGuard {
    type Target = StatusStore;

    fn deref(&self) -> &StatusStore {
        &self.store
    }
}

impl DerefMut for StatusGuard {
    fn deref_mut(&mut self) -> &mut StatusStore {
        &mut self.store
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        self.persisted = true;
        if let Err(e) = self.store.save(&self.path) {
            error!("failed to save status on early exit: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StatusStore::load(&tmp.path().join("status.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");
        fs::write(&path, "{ not json").unwrap();
        let err = StatusStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::StatusFormat { .. }), "{err}");

        fs::write(&path, r#"{"/a.git": "yesterday"}"#).unwrap();
        assert!(matches!(
            StatusStore::load(&path).unwrap_err(),
            Error::StatusFormat { .. }
        ));
    }

    #[test]
    fn timestamps_survive_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");

        let mut store = StatusStore::new();
        store.record(Path::new("/srv/mirrors/a.git"), 1_700_000_123);
        store.record(Path::new("/srv/mirrors/b.git"), i64::from(u32::MAX) + 7);
        store.save(&path).unwrap();

        let loaded = StatusStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(
            loaded.last_updated(Path::new("/srv/mirrors/a.git")),
            Some(1_700_000_123)
        );

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["/srv/mirrors/a.git"], 1_700_000_123);
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");
        fs::write(&path, r#"{"/old.git": 1, "/older.git": 2}"#).unwrap();

        StatusStore::new().save(&path).unwrap();
        assert!(StatusStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn guard_persists_when_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");
        {
            let mut guard = StatusGuard::open(&path).unwrap();
            guard.record(Path::new("/x.git"), 42);
        }
        let loaded = StatusStore::load(&path).unwrap();
        assert_eq!(loaded.last_updated(Path::new("/x.git")), Some(42));
    }

    #[test]
    fn guard_persists_on_panic() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");
        let guard_path = path.clone();

        let result = std::panic::catch_unwind(move || {
            let mut guard = StatusGuard::open(&guard_path).unwrap();
            guard.record(Path::new("/y.git"), 7);
            panic!("boom");
        });
        assert!(result.is_err());

        let loaded = StatusStore::load(&path).unwrap();
        assert_eq!(loaded.last_updated(Path::new("/y.git")), Some(7));
    }

    #[test]
    fn persist_reports_write_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing-dir").join("status.json");
        let guard = StatusGuard::open(&path).unwrap();
        let err = guard.persist().unwrap_err();
        assert!(matches!(err, Error::StatusIo { .. }), "{err}");
    }
}
