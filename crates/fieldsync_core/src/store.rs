//! Storage adapter contract for syncable units.

use crate::error::{CoreError, CoreResult};
use crate::types::{Record, RecordId, SyncStatus};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Storage adapter for one syncable unit (table or collection).
///
/// The sync engine resolves one `UnitStore` per registered unit at startup
/// and drives it through this uniform capability set, so adding a unit never
/// grows a dispatch branch anywhere in the engine.
///
/// # Consistency
///
/// Implementations must provide read-after-write consistency within a single
/// task: a `fetch_unsynced` call issued after `mark_synced` returns must not
/// see the marked records. The batch upload loop's termination depends on
/// this.
pub trait UnitStore: Send + Sync {
    /// Returns up to `limit` records whose status is `Unsynced`.
    ///
    /// Order is implementation-defined but must be stable across repeated
    /// calls so that paging is exhaustive.
    fn fetch_unsynced(&self, limit: usize) -> CoreResult<Vec<Record>>;

    /// Returns up to `limit` records of the unit regardless of status,
    /// skipping the first `skip`, in the same stable order on every call.
    ///
    /// Used by adapters whose backend pages with an explicit cursor over the
    /// whole collection rather than re-querying the shrinking unsynced set;
    /// the caller filters for unsynced records itself, so marking during the
    /// walk does not disturb the cursor.
    fn fetch_page(&self, skip: usize, limit: usize) -> CoreResult<Vec<Record>>;

    /// Flips the given records to `Completed`.
    fn mark_synced(&self, ids: &[RecordId]) -> CoreResult<()>;

    /// Applies a page of remote changes to local storage.
    ///
    /// Remote records land already `Completed`; last-writer-wins, so an
    /// existing local record with the same ID is overwritten.
    fn apply_remote(&self, records: &[Record]) -> CoreResult<()>;

    /// Number of records still awaiting upload.
    fn unsynced_count(&self) -> CoreResult<usize>;
}

/// An in-memory unit store.
///
/// Backs tests and small deployments. Records are held in a `BTreeMap` and
/// unsynced reads page in primary-key-descending order, which keeps paging
/// stable across calls.
#[derive(Default)]
pub struct MemoryUnitStore {
    records: RwLock<BTreeMap<RecordId, Record>>,
}

impl MemoryUnitStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, as the domain write path would.
    ///
    /// An insert overwrites any record with the same ID and resets its
    /// status to `Unsynced`.
    pub fn insert(&self, mut record: Record) {
        record.sync_status = SyncStatus::Unsynced;
        self.records.write().insert(record.id, record);
    }

    /// Returns a record by ID, if present.
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records.read().get(&id).cloned()
    }

    /// Total number of records in the store.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl UnitStore for MemoryUnitStore {
    fn fetch_unsynced(&self, limit: usize) -> CoreResult<Vec<Record>> {
        Ok(self
            .records
            .read()
            .values()
            .rev()
            .filter(|r| r.is_unsynced())
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_page(&self, skip: usize, limit: usize) -> CoreResult<Vec<Record>> {
        Ok(self
            .records
            .read()
            .values()
            .rev()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_synced(&self, ids: &[RecordId]) -> CoreResult<()> {
        let mut records = self.records.write();
        for id in ids {
            let record = records
                .get_mut(id)
                .ok_or(CoreError::RecordNotFound(*id))?;
            record.sync_status = SyncStatus::Completed;
        }
        Ok(())
    }

    fn apply_remote(&self, incoming: &[Record]) -> CoreResult<()> {
        let mut records = self.records.write();
        for record in incoming {
            let mut record = record.clone();
            record.sync_status = SyncStatus::Completed;
            records.insert(record.id, record);
        }
        Ok(())
    }

    fn unsynced_count(&self) -> CoreResult<usize> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| r.is_unsynced())
            .count())
    }
}
