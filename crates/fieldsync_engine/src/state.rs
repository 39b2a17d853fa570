//! Persisted per-unit sync state.

use crate::config::{Priority, SyncUnitConfig};
use crate::error::{SyncError, SyncResult};
use fieldsync_core::SyncStatus;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Persisted outcome of a unit's most recent sync attempt.
///
/// Exactly one row exists per registered unit, keyed by `unit_name`. The
/// status reflects the most recent completed attempt (or `InProgress` while
/// an attempt is underway), not record-level upload progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Unit name (primary key).
    pub unit_name: String,
    /// Outcome of the most recent attempt.
    pub status: SyncStatus,
    /// Time of the most recent attempt, epoch milliseconds.
    pub last_sync_time: Option<i64>,
    /// Error message of the most recent failed attempt.
    pub last_sync_error: Option<String>,
    /// Batch size the unit was configured with at that attempt.
    pub batch_size: u32,
    /// Priority the unit was configured with at that attempt.
    pub priority: Priority,
}

impl SyncState {
    /// Creates the default row for a unit that has never been synced.
    #[must_use]
    pub fn unseen(config: &SyncUnitConfig) -> Self {
        Self {
            unit_name: config.name.clone(),
            status: SyncStatus::Unsynced,
            last_sync_time: None,
            last_sync_error: None,
            batch_size: config.batch_size,
            priority: config.priority,
        }
    }
}

/// Persisted store of per-unit sync state.
///
/// Writes are keyed by unit name, so concurrent tasks in one tier touch
/// disjoint keys and need no coordination beyond what the store itself
/// provides. A read after a write from the same task must observe the write.
pub trait SyncStateStore: Send + Sync {
    /// Inserts or overwrites the row for `state.unit_name`.
    fn upsert(&self, state: SyncState) -> SyncResult<()>;

    /// Returns the row for a unit, or `None` if the unit has never been
    /// seen (callers treat that as an unsynced default).
    fn get(&self, unit_name: &str) -> SyncResult<Option<SyncState>>;

    /// Returns every persisted row.
    fn all(&self) -> SyncResult<Vec<SyncState>>;

    /// Deletes a unit's row on deregistration.
    fn remove(&self, unit_name: &str) -> SyncResult<()>;
}

/// An in-memory sync state store.
#[derive(Default)]
pub struct MemoryStateStore {
    rows: RwLock<HashMap<String, SyncState>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncStateStore for MemoryStateStore {
    fn upsert(&self, state: SyncState) -> SyncResult<()> {
        self.rows.write().insert(state.unit_name.clone(), state);
        Ok(())
    }

    fn get(&self, unit_name: &str) -> SyncResult<Option<SyncState>> {
        Ok(self.rows.read().get(unit_name).cloned())
    }

    fn all(&self) -> SyncResult<Vec<SyncState>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    fn remove(&self, unit_name: &str) -> SyncResult<()> {
        self.rows.write().remove(unit_name);
        Ok(())
    }
}

/// A sync state store persisted as a JSON snapshot on disk.
///
/// The whole map is loaded at open and rewritten on every mutation via a
/// temp file and rename, so a crash mid-write leaves the previous snapshot
/// intact.
pub struct FileStateStore {
    path: PathBuf,
    rows: RwLock<HashMap<String, SyncState>>,
}

impl FileStateStore {
    /// Opens a store at `path`, loading any existing snapshot.
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let rows = if path.exists() {
            let bytes = fs::read(&path)
                .map_err(|e| SyncError::StateStore(format!("read {}: {e}", path.display())))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| SyncError::StateStore(format!("parse {}: {e}", path.display())))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    /// Path of the on-disk snapshot.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn persist(&self, rows: &HashMap<String, SyncState>) -> SyncResult<()> {
        let bytes = serde_json::to_vec_pretty(rows)
            .map_err(|e| SyncError::StateStore(format!("encode state: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .map_err(|e| SyncError::StateStore(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| SyncError::StateStore(format!("rename {}: {e}", tmp.display())))?;
        Ok(())
    }
}

impl SyncStateStore for FileStateStore {
    fn upsert(&self, state: SyncState) -> SyncResult<()> {
        let mut rows = self.rows.write();
        rows.insert(state.unit_name.clone(), state);
        self.persist(&rows)
    }

    fn get(&self, unit_name: &str) -> SyncResult<Option<SyncState>> {
        Ok(self.rows.read().get(unit_name).cloned())
    }

    fn all(&self) -> SyncResult<Vec<SyncState>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    fn remove(&self, unit_name: &str) -> SyncResult<()> {
        let mut rows = self.rows.write();
        rows.remove(unit_name);
        self.persist(&rows)
    }
}
