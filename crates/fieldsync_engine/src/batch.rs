//! Batch upload/download engine.

use crate::config::MarkingMode;
use crate::error::{SyncError, SyncResult};
use crate::registry::UnitHandle;
use crate::transport::RemoteTransport;
use std::sync::Arc;
use tracing::debug;

/// Pages a unit's records through the remote transport in bounded batches.
///
/// The engine never catches or classifies errors: transport and storage
/// failures propagate unchanged to the coordinator's per-unit sequence.
#[derive(Clone)]
pub struct BatchEngine {
    transport: Arc<dyn RemoteTransport>,
}

impl BatchEngine {
    /// Creates a batch engine over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    /// Pushes every locally unsynced record of `unit` to the remote.
    ///
    /// Returns the number of records accepted and marked.
    pub async fn upload(&self, unit: &UnitHandle) -> SyncResult<u64> {
        match unit.config.marking {
            MarkingMode::Batch => self.upload_batch_marked(unit).await,
            MarkingMode::PerRecord => self.upload_per_record(unit).await,
        }
    }

    /// Batch-level marking: re-fetch the unsynced set, push one batch per
    /// remote call, mark the accepted IDs together.
    ///
    /// Termination relies on the store's read-after-write guarantee: the
    /// next fetch no longer sees marked records.
    async fn upload_batch_marked(&self, unit: &UnitHandle) -> SyncResult<u64> {
        let name = unit.config.name.as_str();
        let batch_size = unit.config.batch_size as usize;
        let mut total = 0u64;

        loop {
            let records = unit.store.fetch_unsynced(batch_size)?;
            if records.is_empty() {
                break;
            }

            let accepted = self.transport.upload_batch(name, &records).await?;
            if accepted.is_empty() {
                // A call that "succeeds" while accepting nothing would make
                // this loop re-fetch the same records forever.
                return Err(SyncError::rejection(name, "no records accepted"));
            }

            unit.store.mark_synced(&accepted)?;
            total += accepted.len() as u64;
            debug!(unit = name, batch = records.len(), accepted = accepted.len(), "batch uploaded");
        }

        Ok(total)
    }

    /// Per-record marking: walk the unit with an explicit skip cursor
    /// advanced by the batch size, uploading and marking each still-unsynced
    /// record in its own remote call.
    ///
    /// A record the remote declines stays unsynced and does not stop the
    /// walk; the loop ends on the first page shorter than the batch size.
    async fn upload_per_record(&self, unit: &UnitHandle) -> SyncResult<u64> {
        let name = unit.config.name.as_str();
        let batch_size = unit.config.batch_size as usize;
        let mut skip = 0usize;
        let mut total = 0u64;

        loop {
            let page = unit.store.fetch_page(skip, batch_size)?;

            for record in page.iter().filter(|r| r.is_unsynced()) {
                let accepted = self
                    .transport
                    .upload_batch(name, std::slice::from_ref(record))
                    .await?;
                if accepted.contains(&record.id) {
                    unit.store.mark_synced(&[record.id])?;
                    total += 1;
                } else {
                    debug!(unit = name, record = %record.id, "record declined, left unsynced");
                }
            }

            if page.len() < batch_size {
                break;
            }
            skip += batch_size;
        }

        Ok(total)
    }

    /// Pulls remote changes for `unit` newer than `since` and applies them
    /// locally, paging with the unit's batch size until a short page.
    ///
    /// Returns the number of records applied.
    pub async fn download(&self, unit: &UnitHandle, since: Option<i64>) -> SyncResult<u64> {
        let name = unit.config.name.as_str();
        let batch_size = unit.config.batch_size as usize;
        let mut skip = 0usize;
        let mut total = 0u64;

        loop {
            let page = self
                .transport
                .pull_changes(name, since, skip, batch_size)
                .await?;
            let fetched = page.len();

            if fetched > 0 {
                unit.store.apply_remote(&page)?;
                total += fetched as u64;
            }

            if fetched < batch_size {
                break;
            }
            skip += batch_size;
        }

        if total > 0 {
            debug!(unit = name, records = total, "remote changes applied");
        }
        Ok(total)
    }
}
