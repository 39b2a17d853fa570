//! Retry-aware execution wrapper, the scheduler-facing boundary.

use crate::config::RunnerConfig;
use crate::coordinator::{SyncCoordinator, SyncReport};
use crate::error::SyncError;
use std::sync::Arc;
use tracing::{info, warn};

/// Scheduler-facing outcome of one sync run.
///
/// Returned by value so the scheduler never inspects attempt counters or
/// exception state to classify a failure.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The run finished; all tiers drained without error.
    Completed(SyncReport),
    /// The run failed inside the attempt budget; the scheduler should
    /// re-invoke with `attempt_count + 1` after a backoff it controls.
    Retryable(SyncError),
    /// The run failed with the attempt budget exhausted; auto-retry should
    /// stop and the failure be surfaced.
    Permanent(SyncError),
}

impl SyncOutcome {
    /// Returns true for [`SyncOutcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns true for [`SyncOutcome::Retryable`].
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Returns true for [`SyncOutcome::Permanent`].
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// Runs the coordinator once per scheduler invocation and converts failure
/// into a bounded retry decision.
///
/// The runner never inspects which unit failed; that detail lives in the
/// persisted per-unit state. Retry is all-or-nothing for the whole run, and
/// backoff timing belongs to the scheduler.
pub struct SyncRunner {
    coordinator: Arc<SyncCoordinator>,
    config: RunnerConfig,
}

impl SyncRunner {
    /// Creates a runner with the default attempt budget of 3.
    #[must_use]
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self::with_config(coordinator, RunnerConfig::default())
    }

    /// Creates a runner with an explicit configuration.
    #[must_use]
    pub fn with_config(coordinator: Arc<SyncCoordinator>, config: RunnerConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Executes one sync run for the scheduler's `attempt_count` (0-based).
    pub async fn execute(&self, attempt_count: u32) -> SyncOutcome {
        match self.coordinator.run_once().await {
            Ok(report) => {
                info!(attempt = attempt_count, "sync run succeeded");
                SyncOutcome::Completed(report)
            }
            Err(e) if attempt_count < self.config.max_attempts => {
                warn!(attempt = attempt_count, error = %e, "sync run failed, retry requested");
                SyncOutcome::Retryable(e)
            }
            Err(e) => {
                warn!(attempt = attempt_count, error = %e, "sync run failed permanently");
                SyncOutcome::Permanent(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Priority, SyncUnitConfig};
    use crate::registry::UnitRegistry;
    use crate::state::{MemoryStateStore, SyncStateStore};
    use crate::transport::{MockTransport, RemoteTransport};
    use fieldsync_core::{MemoryUnitStore, Record, UnitStore};

    fn runner(failing: bool) -> SyncRunner {
        let store = Arc::new(MemoryUnitStore::new());
        store.insert(Record::new(vec![1]));
        let registry = Arc::new(
            UnitRegistry::builder()
                .register(
                    SyncUnitConfig::new("farmers", Priority::High),
                    store as Arc<dyn UnitStore>,
                )
                .build(),
        );
        let transport = Arc::new(MockTransport::new());
        if failing {
            transport.fail_uploads("farmers", "gateway down");
        }
        let coordinator = Arc::new(SyncCoordinator::new(
            registry,
            Arc::new(MemoryStateStore::new()) as Arc<dyn SyncStateStore>,
            transport as Arc<dyn RemoteTransport>,
        ));
        SyncRunner::new(coordinator)
    }

    #[tokio::test]
    async fn success_is_completed_at_any_attempt() {
        let runner = runner(false);
        assert!(runner.execute(0).await.is_completed());
        assert!(runner.execute(3).await.is_completed());
    }

    #[tokio::test]
    async fn failure_respects_the_attempt_budget() {
        let runner = runner(true);
        for attempt in 0..3 {
            assert!(
                runner.execute(attempt).await.is_retryable(),
                "attempt {attempt} should request a retry"
            );
        }
        assert!(runner.execute(3).await.is_permanent());
        assert!(runner.execute(7).await.is_permanent());
    }

    #[tokio::test]
    async fn custom_budget() {
        let store = Arc::new(MemoryUnitStore::new());
        store.insert(Record::new(vec![1]));
        let registry = Arc::new(
            UnitRegistry::builder()
                .register(
                    SyncUnitConfig::new("farmers", Priority::High),
                    store as Arc<dyn UnitStore>,
                )
                .build(),
        );
        let transport = Arc::new(MockTransport::new());
        transport.fail_uploads("farmers", "gateway down");
        let coordinator = Arc::new(SyncCoordinator::new(
            registry,
            Arc::new(MemoryStateStore::new()) as Arc<dyn SyncStateStore>,
            transport as Arc<dyn RemoteTransport>,
        ));
        let runner = SyncRunner::with_config(coordinator, RunnerConfig::new(1));

        assert!(runner.execute(0).await.is_retryable());
        assert!(runner.execute(1).await.is_permanent());
    }
}
