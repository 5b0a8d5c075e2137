// src/snapshot_store.rs

use crate::context::SNAPSHOT_FILE_NAME;
use crate::error::{AppError, AppResult};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const SNAPSHOT_MAX_BYTES: u64 = 1024 * 1024;

/// Snapshots older than this are treated as absent.
pub const SNAPSHOT_MAX_AGE_HOURS: i64 = 24;

/// Persisted value of one field: a scalar, or the checked values of a multi-choice group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    One(String),
    Many(Vec<String>),
}

/// On-disk shape:
///
/// {
///   "contact_001": "Jane",
///   "location_003": ["coastal", "suburban"],
///   "currentSection": 3,
///   "timestamp": "2025-01-01T10:00:00Z"
/// }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub fields: BTreeMap<String, SnapshotValue>,

    #[serde(rename = "currentSection")]
    pub current_section: usize,

    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) > Duration::hours(SNAPSHOT_MAX_AGE_HOURS)
    }
}

/// Single-slot snapshot file with atomic replace.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SNAPSHOT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// `Ok(None)` when no snapshot has been written.
    pub fn read(&self) -> AppResult<Option<Snapshot>> {
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::SnapshotReadFailed(e.to_string())),
        };

        let bytes = meta.len();
        if bytes > SNAPSHOT_MAX_BYTES {
            return Err(AppError::SnapshotTooLarge {
                bytes,
                max: SNAPSHOT_MAX_BYTES,
            });
        }

        let text =
            fs::read_to_string(&self.path).map_err(|e| AppError::SnapshotReadFailed(e.to_string()))?;

        let snap: Snapshot = serde_json::from_str(&text)
            .map_err(|e| AppError::SnapshotInvalidJson(e.to_string()))?;

        Ok(Some(snap))
    }

    /// Read and apply the expiry policy. Expired or unreadable snapshots are purged.
    pub fn load_fresh(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        match self.read() {
            Ok(Some(snap)) if snap.is_expired(now) => {
                tracing::info!(
                    saved_at = %snap.timestamp,
                    "saved progress expired; discarding"
                );
                self.remove_best_effort();
                None
            }
            Ok(Some(snap)) => Some(snap),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "saved progress unreadable; discarding");
                self.remove_best_effort();
                None
            }
        }
    }

    /// Replace the snapshot file.
    ///
    /// Snapshots are rewritten on every answer change from the UI thread, so
    /// they are flushed but not fsynced. The rename still never exposes a
    /// partial file; a crash can at worst lose the latest answer.
    pub fn write(&self, snap: &Snapshot) -> AppResult<()> {
        let json =
            serde_json::to_vec(snap).map_err(|e| AppError::SnapshotWriteFailed(e.to_string()))?;

        write_atomic(&self.path, &json, Durability::Flush).map_err(|e| match e.stage {
            WriteStage::Prepare | WriteStage::Write => AppError::SnapshotWriteFailed(e.to_string()),
            WriteStage::Sync => AppError::SnapshotSyncFailed(e.to_string()),
            WriteStage::Rename => AppError::SnapshotRenameFailed(e.to_string()),
        })?;

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "snapshot written");
        Ok(())
    }

    /// Removing an absent snapshot is not an error.
    pub fn remove(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::SnapshotRemoveFailed(e.to_string())),
        }
    }

    fn remove_best_effort(&self) {
        if let Err(e) = self.remove() {
            tracing::warn!(error = %e, "could not purge snapshot");
        }
    }
}

/// How far a replaced file must get before `write_atomic` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Buffers flushed to the OS.
    Flush,
    /// Contents fsynced before the rename.
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Prepare,
    Write,
    Sync,
    Rename,
}

#[derive(Debug)]
pub struct AtomicWriteError {
    pub stage: WriteStage,
    pub source: std::io::Error,
}

impl std::fmt::Display for AtomicWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.stage, self.source)
    }
}

/// Write `bytes` to a random sibling temp file, then rename it over `path`.
///
/// Readers see either the old contents or the new ones, never a mix.
pub fn write_atomic(
    path: &Path,
    bytes: &[u8],
    durability: Durability,
) -> Result<(), AtomicWriteError> {
    let at = |stage| move |source| AtomicWriteError { stage, source };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(at(WriteStage::Prepare))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");

    let mut rnd = [0u8; 12];
    OsRng.fill_bytes(&mut rnd);
    let tmp = parent.join(format!(".{name}.{}.tmp", hex::encode(rnd)));

    let mut opts = OpenOptions::new();
    opts.create_new(true).write(true);
    #[cfg(unix)]
    {
        opts.mode(0o600);
    }

    let mut f = opts.open(&tmp).map_err(at(WriteStage::Prepare))?;

    let res = (|| -> Result<(), AtomicWriteError> {
        f.write_all(bytes).map_err(at(WriteStage::Write))?;
        f.flush().map_err(at(WriteStage::Write))?;
        if durability == Durability::Sync {
            f.sync_all().map_err(at(WriteStage::Sync))?;
        }
        fs::rename(&tmp, path).map_err(at(WriteStage::Rename))
    })();

    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snap_at(ts: DateTime<Utc>) -> Snapshot {
        let mut fields = BTreeMap::new();
        fields.insert("contact_001".to_string(), SnapshotValue::One("Jane".into()));
        fields.insert(
            "location_003".to_string(),
            SnapshotValue::Many(vec!["coastal".into(), "suburban".into()]),
        );
        Snapshot {
            fields,
            current_section: 3,
            timestamp: ts,
        }
    }

    fn list_tmp_files(dir: &Path) -> Vec<PathBuf> {
        let mut out = vec![];
        if let Ok(rd) = fs::read_dir(dir) {
            for e in rd.flatten() {
                let p = e.path();
                if let Some(name) = p.file_name().and_then(|s| s.to_str()) {
                    if name.starts_with('.') && name.ends_with(".tmp") {
                        out.push(p);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn write_then_read_roundtrip_ok() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        let snap = snap_at(Utc::now());

        store.write(&snap).unwrap();
        let got = store.read().unwrap().unwrap();

        assert_eq!(got, snap);
        assert!(list_tmp_files(td.path()).is_empty());
    }

    #[test]
    fn on_disk_shape_uses_flat_keys() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        store.write(&snap_at(Utc::now())).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["currentSection"], 3);
        assert_eq!(raw["contact_001"], "Jane");
        assert_eq!(raw["location_003"][1], "suburban");
        assert!(raw["timestamp"].is_string());
    }

    #[test]
    fn read_missing_is_none() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        assert!(store.read().unwrap().is_none());
        store.remove().unwrap();
    }

    #[test]
    fn invalid_json_is_error_and_load_fresh_purges() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        fs::write(store.path(), b"{ not json").unwrap();

        assert!(matches!(store.read(), Err(AppError::SnapshotInvalidJson(_))));
        assert!(store.load_fresh(Utc::now()).is_none());
        assert!(!store.exists());
    }

    #[test]
    fn oversized_snapshot_rejected() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        let big = vec![b' '; (SNAPSHOT_MAX_BYTES + 1) as usize];
        fs::write(store.path(), big).unwrap();

        assert!(matches!(store.read(), Err(AppError::SnapshotTooLarge { .. })));
    }

    #[test]
    fn expired_snapshot_is_purged() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        let now = Utc::now();
        store.write(&snap_at(now - Duration::hours(25))).unwrap();

        assert!(store.load_fresh(now).is_none());
        assert!(!store.exists());
    }

    #[test]
    fn snapshot_just_under_max_age_is_kept() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());
        let now = Utc::now();
        store.write(&snap_at(now - Duration::hours(23))).unwrap();

        assert!(store.load_fresh(now).is_some());
    }

    #[test]
    fn rewrite_replaces_contents_without_leftovers() {
        let td = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(td.path());

        let first = snap_at(Utc::now());
        store.write(&first).unwrap();

        let mut second = first.clone();
        second.current_section = 5;
        second
            .fields
            .insert("contact_001".into(), SnapshotValue::One("Janet".into()));
        store.write(&second).unwrap();

        assert_eq!(store.read().unwrap().unwrap(), second);
        assert!(list_tmp_files(td.path()).is_empty());
    }

    #[test]
    fn write_atomic_synced_creates_parent_and_replaces() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested").join("record.json");

        write_atomic(&path, b"one", Durability::Sync).unwrap();
        write_atomic(&path, b"two", Durability::Sync).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(list_tmp_files(path.parent().unwrap()).is_empty());
    }

    #[test]
    fn write_atomic_failed_rename_cleans_temp_file() {
        let td = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the rename fail.
        let path = td.path().join("occupied");
        fs::create_dir_all(path.join("child")).unwrap();

        let err = write_atomic(&path, b"x", Durability::Flush).unwrap_err();
        assert_eq!(err.stage, WriteStage::Rename);
        assert!(list_tmp_files(td.path()).is_empty());
    }
}
