//! Persistent storage for session snapshots.
//!
//! Debounced writes, backup rotation, and JSON persistence under
//! `<root>/profiles/<profile>/session.json`.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex as PLMutex;

use crate::error::{StoreError, StoreResult};
use crate::model::{SCHEMA_VERSION, SessionSnapshot};

const BACKUP_EXTENSIONS: [&str; 3] = ["json.bak", "json.bak.1", "json.bak.2"];

/// Low-level storage for one profile's session file.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    profile: String,
}

impl Storage {
    pub fn new(root: PathBuf, profile: String) -> Self {
        Self { root, profile }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn load(&self) -> StoreResult<SessionSnapshot> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(SessionSnapshot::default());
        }
        let data = fs::read_to_string(&path).map_err(|e| StoreError::ReadError(e.to_string()))?;
        match serde_json::from_str::<SessionSnapshot>(&data) {
            Ok(snapshot) => self.migrate(snapshot),
            Err(parse_err) => {
                log::warn!(
                    "session file {} is unreadable ({}), trying backups",
                    path.display(),
                    parse_err
                );
                if let Some(backup) = self.load_from_backup() {
                    return self.migrate(backup);
                }
                Err(StoreError::ParseError(parse_err.to_string()))
            }
        }
    }

    /// Newest backup that still parses.
    fn load_from_backup(&self) -> Option<SessionSnapshot> {
        let path = self.file_path();
        BACKUP_EXTENSIONS.iter().find_map(|extension| {
            let backup_path = path.with_extension(extension);
            let data = fs::read_to_string(&backup_path).ok()?;
            let snapshot = serde_json::from_str::<SessionSnapshot>(&data).ok()?;
            log::info!("restoring session from {}", backup_path.display());
            Some(snapshot)
        })
    }

    fn migrate(&self, mut snapshot: SessionSnapshot) -> StoreResult<SessionSnapshot> {
        if snapshot.schema_version > SCHEMA_VERSION {
            return Err(StoreError::ParseError(format!(
                "schema version {} is newer than supported {}",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }
        if snapshot.schema_version < SCHEMA_VERSION {
            log::debug!(
                "migrating session schema {} -> {}",
                snapshot.schema_version,
                SCHEMA_VERSION
            );
            snapshot.schema_version = SCHEMA_VERSION;
        }
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> StoreResult<()> {
        let path = self.file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteError(e.to_string()))?;
        }
        self.rotate_backups(&path);
        let tmp_path = path.with_extension("json.tmp");
        let file =
            fs::File::create(&tmp_path).map_err(|e| StoreError::WriteError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)
            .map_err(|e| StoreError::SerializeError(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StoreError::WriteError(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| StoreError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Shifts every backup one slot older, dropping the oldest, and moves
    /// the live file into the newest slot.
    fn rotate_backups(&self, path: &Path) {
        if !path.exists() {
            return;
        }

        let slots: Vec<PathBuf> = BACKUP_EXTENSIONS
            .iter()
            .map(|extension| path.with_extension(extension))
            .collect();
        let (Some(newest), Some(oldest)) = (slots.first(), slots.last()) else {
            return;
        };

        let _ = fs::remove_file(oldest);
        for pair in slots.windows(2).rev() {
            if pair[0].exists()
                && let Err(e) = fs::rename(&pair[0], &pair[1])
            {
                log::warn!("could not rotate {}: {}", pair[0].display(), e);
            }
        }
        if let Err(e) = fs::rename(path, newest) {
            log::warn!("could not back up {}: {}", path.display(), e);
        }
    }

    pub fn file_path(&self) -> PathBuf {
        tabdeck_shared::paths::profile_dir(&self.root, &self.profile).join("session.json")
    }
}

pub fn default_storage_root() -> StoreResult<PathBuf> {
    tabdeck_shared::paths::data_dir().map_err(|e| StoreError::ReadError(e.to_string()))
}

enum SaveMessage {
    Save,
    Shutdown,
}

/// Debounced storage wrapper that coalesces rapid saves.
pub struct DebouncedStorage {
    storage: Storage,
    sender: Sender<SaveMessage>,
    pending: Arc<PLMutex<Option<SessionSnapshot>>>,
    worker: Option<JoinHandle<()>>,
}

impl DebouncedStorage {
    /// Creates a new debounced storage with the given debounce delay in milliseconds.
    pub fn new(storage: Storage, debounce_ms: u64) -> Self {
        let (sender, receiver) = mpsc::channel();
        let pending: Arc<PLMutex<Option<SessionSnapshot>>> = Arc::new(PLMutex::new(None));
        let pending_clone = pending.clone();
        let storage_clone = storage.clone();
        let debounce = Duration::from_millis(debounce_ms);

        let worker = thread::spawn(move || {
            Self::worker_loop(receiver, storage_clone, pending_clone, debounce);
        });

        Self {
            storage,
            sender,
            pending,
            worker: Some(worker),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Queues a save operation (will be debounced).
    pub fn save(&self, snapshot: &SessionSnapshot) {
        *self.pending.lock() = Some(snapshot.clone());
        let _ = self.sender.send(SaveMessage::Save);
    }

    /// Writes now and drops whatever was queued, since `snapshot` supersedes it.
    pub fn save_immediate(&self, snapshot: &SessionSnapshot) -> StoreResult<()> {
        self.pending.lock().take();
        self.storage.save(snapshot)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    fn worker_loop(
        receiver: Receiver<SaveMessage>,
        storage: Storage,
        pending: Arc<PLMutex<Option<SessionSnapshot>>>,
        debounce: Duration,
    ) {
        let mut last_request: Option<Instant> = None;

        loop {
            let timeout = if last_request.is_some() {
                debounce
            } else {
                Duration::from_secs(60)
            };

            match receiver.recv_timeout(timeout) {
                Ok(SaveMessage::Save) => {
                    last_request = Some(Instant::now());
                }
                Ok(SaveMessage::Shutdown) => {
                    Self::write_pending(&storage, &pending);
                    break;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Some(t) = last_request
                        && t.elapsed() >= debounce
                    {
                        Self::write_pending(&storage, &pending);
                        last_request = None;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn write_pending(storage: &Storage, pending: &PLMutex<Option<SessionSnapshot>>) {
        let Some(snapshot) = pending.lock().take() else {
            return;
        };
        if let Err(e) = storage.save(&snapshot) {
            log::warn!("debounced session save failed: {}", e);
        }
    }
}

impl Drop for DebouncedStorage {
    fn drop(&mut self) {
        let _ = self.sender.send(SaveMessage::Shutdown);
        Self::write_pending(&self.storage, &self.pending);
        if let Some(w) = self.worker.take() {
            let _ = w.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabdeck_registry::{TabId, TabRecord};
    use tempfile::TempDir;

    fn snapshot_with(session_ids: &[&str]) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::default();
        for (i, session_id) in session_ids.iter().enumerate() {
            let id = TabId::new(i as u64 + 1).unwrap();
            snapshot.tabs.push(TabRecord::new(id, *session_id));
        }
        snapshot
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());
        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.schema_version, SCHEMA_VERSION);
        assert!(snapshot.tabs.is_empty());
        assert!(snapshot.closed_tabs.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());

        storage.save(&snapshot_with(&["a", "b"])).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.tabs.len(), 2);
        assert_eq!(loaded.tabs[1].session_id, "b");
        assert!(
            storage
                .file_path()
                .ends_with("profiles/test/session.json")
        );
    }

    #[test]
    fn test_backup_rotation() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());

        for i in 0..5 {
            storage.save(&snapshot_with(&[&format!("s{}", i)])).unwrap();
        }

        let path = storage.file_path();
        assert!(!path.with_extension("json.tmp").exists());

        let session_in = |path: &Path| {
            let data = fs::read_to_string(path).unwrap();
            let snapshot: SessionSnapshot = serde_json::from_str(&data).unwrap();
            snapshot.tabs[0].session_id.clone()
        };
        assert_eq!(session_in(&path), "s4");
        assert_eq!(session_in(&path.with_extension("json.bak")), "s3");
        assert_eq!(session_in(&path.with_extension("json.bak.1")), "s2");
        assert_eq!(session_in(&path.with_extension("json.bak.2")), "s1");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_backup() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());

        storage.save(&snapshot_with(&["old"])).unwrap();
        storage.save(&snapshot_with(&["new"])).unwrap();
        fs::write(storage.file_path(), "{ not json").unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.tabs[0].session_id, "old");
    }

    #[test]
    fn test_corrupt_file_without_backup_is_an_error() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());
        let path = storage.file_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "garbage").unwrap();

        assert!(matches!(storage.load(), Err(StoreError::ParseError(_))));
    }

    #[test]
    fn test_version_one_file_is_migrated() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());
        let path = storage.file_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"tabs": [{"id": 4, "sessionId": "legacy", "url": "https://a.example"}]}"#,
        )
        .unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert_eq!(loaded.tabs[0].id.get(), 4);
        assert!(loaded.tabs[0].visible);
        assert!(loaded.closed_tabs.is_empty());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());
        let path = storage.file_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"schemaVersion": 99, "tabs": []}"#).unwrap();

        assert!(storage.load().is_err());
    }

    #[test]
    fn test_debounced_storage_flushes_on_drop() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf(), "test".to_string());
        let debounced = DebouncedStorage::new(storage.clone(), 60_000);

        debounced.save(&snapshot_with(&["first"]));
        debounced.save(&snapshot_with(&["second"]));
        assert!(debounced.has_pending());
        drop(debounced);

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.tabs[0].session_id, "second");
    }
}
