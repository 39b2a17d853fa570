//! Remote transport abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use fieldsync_core::{Record, RecordId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

/// Network boundary to the remote sync service.
///
/// This trait abstracts the wire layer (JSON over HTTP in production,
/// in-memory doubles in tests). Authentication and 401-retry live inside
/// the implementation; the engine only sees success, accepted IDs, or an
/// error.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Submits a batch of records for one unit.
    ///
    /// Returns the IDs the remote accepted. A record missing from the
    /// returned set was declined without the call as a whole failing.
    async fn upload_batch(&self, unit: &str, records: &[Record]) -> SyncResult<Vec<RecordId>>;

    /// Pulls a page of remote changes for one unit.
    ///
    /// `since` is the unit's last sync time (epoch ms, `None` for a first
    /// sync); `skip`/`limit` page through the result. A page shorter than
    /// `limit` is the last one.
    async fn pull_changes(
        &self,
        unit: &str,
        since: Option<i64>,
        skip: usize,
        limit: usize,
    ) -> SyncResult<Vec<Record>>;
}

/// One observed transport invocation, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// An upload of `records` records for `unit`.
    Upload {
        /// Unit name.
        unit: String,
        /// Number of records in the batch.
        records: usize,
    },
    /// A pull at the given cursor for `unit`.
    Pull {
        /// Unit name.
        unit: String,
        /// `since` watermark of the request.
        since: Option<i64>,
        /// Skip cursor of the request.
        skip: usize,
    },
}

impl TransportCall {
    /// Unit name this call was for.
    #[must_use]
    pub fn unit(&self) -> &str {
        match self {
            Self::Upload { unit, .. } | Self::Pull { unit, .. } => unit,
        }
    }
}

#[derive(Debug, Clone)]
struct UploadFailure {
    after_calls: usize,
    message: String,
}

/// A mock transport for testing.
///
/// Accepts every record by default. Tests can script per-unit upload
/// failures, per-record declines, and pull pages, and inspect the ordered
/// call log afterwards.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    upload_failures: Mutex<HashMap<String, UploadFailure>>,
    declined: Mutex<HashMap<String, HashSet<RecordId>>>,
    pull_pages: Mutex<HashMap<String, VecDeque<Vec<Record>>>>,
    accepted: Mutex<Vec<(String, RecordId)>>,
}

impl MockTransport {
    /// Creates a mock that accepts everything and has nothing to pull.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upload for `unit` fail with a retryable transport error.
    pub fn fail_uploads(&self, unit: impl Into<String>, message: impl Into<String>) {
        self.fail_uploads_after(unit, 0, message);
    }

    /// Makes uploads for `unit` fail after `after_calls` successful calls.
    pub fn fail_uploads_after(
        &self,
        unit: impl Into<String>,
        after_calls: usize,
        message: impl Into<String>,
    ) {
        self.upload_failures.lock().insert(
            unit.into(),
            UploadFailure {
                after_calls,
                message: message.into(),
            },
        );
    }

    /// Makes the remote decline one record of `unit` without failing the
    /// call that carries it.
    pub fn decline_record(&self, unit: impl Into<String>, id: RecordId) {
        self.declined.lock().entry(unit.into()).or_default().insert(id);
    }

    /// Queues a page of remote changes returned by successive pulls for
    /// `unit`, in FIFO order. Unqueued pulls return an empty page.
    pub fn queue_pull_page(&self, unit: impl Into<String>, page: Vec<Record>) {
        self.pull_pages.lock().entry(unit.into()).or_default().push_back(page);
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Number of upload calls observed for `unit`.
    pub fn upload_calls_for(&self, unit: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, TransportCall::Upload { unit: u, .. } if u == unit))
            .count()
    }

    /// Total records accepted across all units.
    pub fn total_accepted(&self) -> usize {
        self.accepted.lock().len()
    }

    /// Records accepted for `unit`, in acceptance order.
    pub fn accepted_for(&self, unit: &str) -> Vec<RecordId> {
        self.accepted
            .lock()
            .iter()
            .filter(|(u, _)| u == unit)
            .map(|(_, id)| *id)
            .collect()
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn upload_batch(&self, unit: &str, records: &[Record]) -> SyncResult<Vec<RecordId>> {
        let prior_calls = self.upload_calls_for(unit);
        self.calls.lock().push(TransportCall::Upload {
            unit: unit.to_string(),
            records: records.len(),
        });

        if let Some(failure) = self.upload_failures.lock().get(unit) {
            if prior_calls >= failure.after_calls {
                return Err(SyncError::transport_retryable(failure.message.clone()));
            }
        }

        let declined = self.declined.lock();
        let declined_for_unit = declined.get(unit);
        let accepted: Vec<RecordId> = records
            .iter()
            .map(|r| r.id)
            .filter(|id| declined_for_unit.map_or(true, |set| !set.contains(id)))
            .collect();
        drop(declined);

        let mut log = self.accepted.lock();
        for id in &accepted {
            log.push((unit.to_string(), *id));
        }
        Ok(accepted)
    }

    async fn pull_changes(
        &self,
        unit: &str,
        since: Option<i64>,
        skip: usize,
        _limit: usize,
    ) -> SyncResult<Vec<Record>> {
        self.calls.lock().push(TransportCall::Pull {
            unit: unit.to_string(),
            since,
            skip,
        });

        Ok(self
            .pull_pages
            .lock()
            .get_mut(unit)
            .and_then(|pages| pages.pop_front())
            .unwrap_or_default())
    }
}
