//! Core type definitions for FieldSync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a syncable record.
///
/// Record IDs are assigned by the domain write path when the record is
/// created and never change afterwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a fresh random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}

/// Sync status of a record or of a whole unit.
///
/// The same three states describe both an individual record (has this row
/// been accepted remotely?) and a unit's persisted sync state (how did the
/// most recent attempt end?).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum SyncStatus {
    /// Not yet synced, or reset by a local edit after a previous sync.
    #[default]
    Unsynced,
    /// A sync attempt is underway.
    InProgress,
    /// Accepted remotely.
    Completed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsynced => write!(f, "unsynced"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A syncable domain record.
///
/// The payload is opaque to the sync engine; the engine only reads and
/// flips `sync_status`. Domain writes create records as `Unsynced` and
/// reset already-synced records to `Unsynced` when they are edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record ID.
    pub id: RecordId,
    /// Opaque serialized payload.
    pub payload: Vec<u8>,
    /// Whether this record has been accepted remotely.
    pub sync_status: SyncStatus,
    /// Last local modification time, epoch milliseconds.
    pub updated_at: i64,
}

impl Record {
    /// Creates a new unsynced record with the given payload.
    #[must_use]
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            id: RecordId::new(),
            payload,
            sync_status: SyncStatus::Unsynced,
            updated_at: now_ms(),
        }
    }

    /// Returns true if this record still needs to be uploaded.
    #[must_use]
    pub fn is_unsynced(&self) -> bool {
        self.sync_status == SyncStatus::Unsynced
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
