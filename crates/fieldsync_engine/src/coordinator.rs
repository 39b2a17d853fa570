//! Tier-ordered sync coordinator.

use crate::batch::BatchEngine;
use crate::config::{CoordinatorConfig, Priority};
use crate::error::{SyncError, SyncResult};
use crate::registry::{UnitHandle, UnitRegistry};
use crate::state::{SyncState, SyncStateStore};
use crate::transport::RemoteTransport;
use fieldsync_core::{now_ms, SyncStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Outcome of one unit's attempt within a run.
#[derive(Debug, Clone)]
pub struct UnitReport {
    /// Unit name.
    pub unit: String,
    /// Records accepted remotely and marked synced.
    pub uploaded: u64,
    /// Remote records applied locally.
    pub downloaded: u64,
}

/// Counters for a whole sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Units whose tasks were dispatched.
    pub units_attempted: u64,
    /// Units that finished their sequence successfully.
    pub units_completed: u64,
    /// Units whose sequence failed (including timeouts and panics).
    pub units_failed: u64,
    /// Total records uploaded across all units.
    pub records_uploaded: u64,
    /// Total records downloaded across all units.
    pub records_downloaded: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Orchestrates sync across all registered units.
///
/// Units are grouped by priority tier and the tiers run strictly in
/// `High`, `Medium`, `Low` order. Inside a tier every unit syncs on its own
/// task; the tier fully drains before its verdict is taken, so a failing
/// unit never erases a sibling's recorded outcome. The first failure in a
/// tier then aborts all subsequent tiers.
pub struct SyncCoordinator {
    registry: Arc<UnitRegistry>,
    states: Arc<dyn SyncStateStore>,
    engine: BatchEngine,
    config: CoordinatorConfig,
}

impl SyncCoordinator {
    /// Creates a coordinator over the given registry, state store, and
    /// transport.
    #[must_use]
    pub fn new(
        registry: Arc<UnitRegistry>,
        states: Arc<dyn SyncStateStore>,
        transport: Arc<dyn RemoteTransport>,
    ) -> Self {
        Self::with_config(registry, states, transport, CoordinatorConfig::default())
    }

    /// Creates a coordinator with an explicit configuration.
    #[must_use]
    pub fn with_config(
        registry: Arc<UnitRegistry>,
        states: Arc<dyn SyncStateStore>,
        transport: Arc<dyn RemoteTransport>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry,
            states,
            engine: BatchEngine::new(transport),
            config,
        }
    }

    /// The unit registry this coordinator runs.
    #[must_use]
    pub fn registry(&self) -> &Arc<UnitRegistry> {
        &self.registry
    }

    /// Persisted per-unit state, for inspection and UI display.
    #[must_use]
    pub fn states(&self) -> &Arc<dyn SyncStateStore> {
        &self.states
    }

    /// Runs a full sync, logging and swallowing any failure.
    ///
    /// This is the top-level failure boundary: a caller is never crashed by
    /// a sync run. Failure detail survives in the per-unit state rows.
    pub async fn start_sync(&self) {
        match self.run_once().await {
            Ok(report) => {
                info!(
                    units = report.units_completed,
                    uploaded = report.records_uploaded,
                    downloaded = report.records_downloaded,
                    elapsed_ms = report.duration.as_millis() as u64,
                    "sync run completed"
                );
            }
            Err(e) => {
                error!(error = %e, "sync run failed");
            }
        }
    }

    /// Runs a full sync and returns its report, or the first error that
    /// aborted it.
    pub async fn run_once(&self) -> SyncResult<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::default();

        for priority in Priority::ORDER {
            let units = self.registry.units_in(priority);
            if units.is_empty() {
                continue;
            }
            debug!(tier = %priority, units = units.len(), "starting tier");

            let mut tasks = JoinSet::new();
            for unit in units {
                report.units_attempted += 1;
                let engine = self.engine.clone();
                let states = Arc::clone(&self.states);
                let timeout = self.config.unit_timeout;
                tasks.spawn(async move { sync_unit(engine, states, unit, timeout).await });
            }

            // Drain the whole tier before judging it, so every sibling of a
            // failing unit still records its own outcome.
            let mut first_error: Option<SyncError> = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(unit_report)) => {
                        report.units_completed += 1;
                        report.records_uploaded += unit_report.uploaded;
                        report.records_downloaded += unit_report.downloaded;
                    }
                    Ok(Err(e)) => {
                        report.units_failed += 1;
                        first_error.get_or_insert(e);
                    }
                    Err(e) => {
                        report.units_failed += 1;
                        first_error.get_or_insert(SyncError::Task(e.to_string()));
                    }
                }
            }

            if let Some(e) = first_error {
                warn!(tier = %priority, error = %e, "tier failed, aborting remaining tiers");
                return Err(e);
            }
        }

        report.duration = started.elapsed();
        Ok(report)
    }
}

/// One unit's sync sequence, run on its own task inside a tier.
async fn sync_unit(
    engine: BatchEngine,
    states: Arc<dyn SyncStateStore>,
    unit: UnitHandle,
    timeout: Option<Duration>,
) -> SyncResult<UnitReport> {
    let name = unit.config.name.clone();
    let prior = states
        .get(&name)?
        .unwrap_or_else(|| SyncState::unseen(&unit.config));
    // Only a completed attempt advances the download watermark: a failed
    // attempt also stamps `last_sync_time`, and using that would hide
    // remote changes made between the last success and the failure.
    let since = match prior.status {
        SyncStatus::Completed => prior.last_sync_time,
        _ => None,
    };

    states.upsert(SyncState {
        unit_name: name.clone(),
        status: SyncStatus::InProgress,
        last_sync_time: Some(now_ms()),
        last_sync_error: None,
        batch_size: unit.config.batch_size,
        priority: unit.config.priority,
    })?;

    let sequence = async {
        let downloaded = engine.download(&unit, since).await?;
        let uploaded = engine.upload(&unit).await?;
        Ok::<(u64, u64), SyncError>((downloaded, uploaded))
    };

    let result = match timeout {
        Some(deadline) => match tokio::time::timeout(deadline, sequence).await {
            Ok(inner) => inner,
            Err(_) => Err(SyncError::Timeout { unit: name.clone() }),
        },
        None => sequence.await,
    };

    match result {
        Ok((downloaded, uploaded)) => {
            states.upsert(SyncState {
                unit_name: name.clone(),
                status: SyncStatus::Completed,
                last_sync_time: Some(now_ms()),
                last_sync_error: None,
                batch_size: unit.config.batch_size,
                priority: unit.config.priority,
            })?;
            debug!(unit = %name, uploaded, downloaded, "unit synced");
            Ok(UnitReport {
                unit: name,
                uploaded,
                downloaded,
            })
        }
        Err(e) => {
            let failed = SyncState {
                unit_name: name.clone(),
                status: SyncStatus::Unsynced,
                last_sync_time: Some(now_ms()),
                last_sync_error: Some(e.to_string()),
                batch_size: unit.config.batch_size,
                priority: unit.config.priority,
            };
            if let Err(store_err) = states.upsert(failed) {
                // Keep the original failure; the state row is stale but the
                // caller still learns the sync failed.
                error!(unit = %name, error = %store_err, "failed to record sync failure");
            }
            warn!(unit = %name, error = %e, "unit sync failed");
            Err(e)
        }
    }
}
