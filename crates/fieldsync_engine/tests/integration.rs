//! End-to-end tests: coordinator and runner against an in-memory remote
//! service.

use async_trait::async_trait;
use fieldsync_core::{now_ms, MemoryUnitStore, Record, RecordId, SyncStatus, UnitStore};
use fieldsync_engine::{
    FileStateStore, MarkingMode, MemoryStateStore, Priority, RemoteTransport, SyncCoordinator,
    SyncError, SyncResult, SyncRunner, SyncStateStore, SyncUnitConfig, UnitRegistry,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Installs the test subscriber once; later calls are no-ops.
///
/// Run with `RUST_LOG=fieldsync_engine=debug` to see the engine's spans
/// interleaved with test output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A remote service that accepts uploads into per-unit buckets and serves
/// primed change feeds, honoring `since` and paging.
#[derive(Default)]
struct RemoteService {
    accepted: Mutex<HashMap<String, Vec<Record>>>,
    changes: Mutex<HashMap<String, Vec<Record>>>,
    failures: Mutex<HashMap<String, String>>,
    records_served: Mutex<usize>,
}

impl RemoteService {
    fn new() -> Self {
        Self::default()
    }

    fn prime_change(&self, unit: &str, record: Record) {
        self.changes.lock().entry(unit.to_string()).or_default().push(record);
    }

    fn fail_unit(&self, unit: &str, message: &str) {
        self.failures.lock().insert(unit.to_string(), message.to_string());
    }

    fn accepted_count(&self, unit: &str) -> usize {
        self.accepted.lock().get(unit).map_or(0, Vec::len)
    }

    fn records_served(&self) -> usize {
        *self.records_served.lock()
    }
}

#[async_trait]
impl RemoteTransport for RemoteService {
    async fn upload_batch(&self, unit: &str, records: &[Record]) -> SyncResult<Vec<RecordId>> {
        if let Some(message) = self.failures.lock().get(unit) {
            return Err(SyncError::transport_retryable(message.clone()));
        }
        self.accepted
            .lock()
            .entry(unit.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(records.iter().map(|r| r.id).collect())
    }

    async fn pull_changes(
        &self,
        unit: &str,
        since: Option<i64>,
        skip: usize,
        limit: usize,
    ) -> SyncResult<Vec<Record>> {
        let changes = self.changes.lock();
        let page: Vec<Record> = changes
            .get(unit)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| since.map_or(true, |t| r.updated_at > t))
                    .skip(skip)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        *self.records_served.lock() += page.len();
        Ok(page)
    }
}

struct World {
    registry: Arc<UnitRegistry>,
    states: Arc<MemoryStateStore>,
    remote: Arc<RemoteService>,
    stores: HashMap<String, Arc<MemoryUnitStore>>,
}

impl World {
    fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.states) as Arc<dyn SyncStateStore>,
            Arc::clone(&self.remote) as Arc<dyn RemoteTransport>,
        )
    }
}

fn world(units: &[(SyncUnitConfig, usize)]) -> World {
    let mut builder = UnitRegistry::builder();
    let mut stores = HashMap::new();
    for (config, records) in units {
        let store = Arc::new(MemoryUnitStore::new());
        for i in 0..*records {
            store.insert(Record::new(vec![i as u8]));
        }
        builder = builder.register(config.clone(), Arc::clone(&store) as Arc<dyn UnitStore>);
        stores.insert(config.name.clone(), store);
    }
    World {
        registry: Arc::new(builder.build()),
        states: Arc::new(MemoryStateStore::new()),
        remote: Arc::new(RemoteService::new()),
        stores,
    }
}

#[tokio::test]
async fn high_priority_unit_drains_in_two_batches() {
    init_tracing();
    // 150 unsynced farmers at batch size 100: one full batch, one half
    // batch, then the empty fetch ends the loop.
    let world = world(&[(
        SyncUnitConfig::new("farmers", Priority::High).with_batch_size(100),
        150,
    )]);

    world.coordinator().run_once().await.unwrap();

    assert_eq!(world.remote.accepted_count("farmers"), 150);
    assert_eq!(world.stores["farmers"].unsynced_count().unwrap(), 0);
    let state = world.states.get("farmers").unwrap().unwrap();
    assert_eq!(state.status, SyncStatus::Completed);
}

#[tokio::test]
async fn cursor_unit_drains_through_short_page() {
    init_tracing();
    // 120 records at batch size 50: pages of 50, 50, and 20; the short
    // page ends the walk with every record uploaded individually.
    let world = world(&[(
        SyncUnitConfig::new("visits", Priority::High)
            .with_batch_size(50)
            .with_marking(MarkingMode::PerRecord),
        120,
    )]);

    world.coordinator().run_once().await.unwrap();

    assert_eq!(world.remote.accepted_count("visits"), 120);
    assert_eq!(world.stores["visits"].unsynced_count().unwrap(), 0);
}

#[tokio::test]
async fn failing_sibling_leaves_the_tier_recorded_and_skips_lower_tiers() {
    init_tracing();
    let world = world(&[
        (SyncUnitConfig::new("a_crops", Priority::Medium), 5),
        (SyncUnitConfig::new("b_projects", Priority::Medium), 5),
        (SyncUnitConfig::new("z_notes", Priority::Low), 5),
    ]);
    world.remote.fail_unit("b_projects", "socket closed");

    let err = world.coordinator().run_once().await.unwrap_err();
    assert!(err.is_retryable());

    assert_eq!(
        world.states.get("a_crops").unwrap().unwrap().status,
        SyncStatus::Completed
    );
    let failed = world.states.get("b_projects").unwrap().unwrap();
    assert_eq!(failed.status, SyncStatus::Unsynced);
    assert_eq!(
        failed.last_sync_error.as_deref(),
        Some("transport error: socket closed")
    );

    // The low tier never started.
    assert_eq!(world.remote.accepted_count("z_notes"), 0);
    assert!(world.states.get("z_notes").unwrap().is_none());
}

#[tokio::test]
async fn runner_retries_then_fails_permanently() {
    init_tracing();
    let world = world(&[(SyncUnitConfig::new("farmers", Priority::High), 3)]);
    world.remote.fail_unit("farmers", "gateway down");
    let runner = SyncRunner::new(Arc::new(world.coordinator()));

    assert!(runner.execute(2).await.is_retryable());
    assert!(runner.execute(3).await.is_permanent());
}

#[tokio::test]
async fn download_applies_remote_changes_and_honors_since() {
    init_tracing();
    let world = world(&[(SyncUnitConfig::new("crops", Priority::High), 0)]);
    let mut incoming = Record::new(vec![0xAB]);
    incoming.updated_at = now_ms();
    world.remote.prime_change("crops", incoming.clone());

    let coordinator = world.coordinator();
    coordinator.run_once().await.unwrap();

    let local = world.stores["crops"].get(incoming.id).unwrap();
    assert_eq!(local.payload, vec![0xAB]);
    assert_eq!(local.sync_status, SyncStatus::Completed);
    assert_eq!(world.remote.records_served(), 1);

    // The change predates the recorded sync time, so the next run pulls
    // nothing new.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    coordinator.run_once().await.unwrap();
    assert_eq!(world.remote.records_served(), 1);
}

#[tokio::test]
async fn full_run_with_mixed_tiers_and_flavors() {
    init_tracing();
    let world = world(&[
        (
            SyncUnitConfig::new("farmers", Priority::High).with_batch_size(100),
            150,
        ),
        (
            SyncUnitConfig::new("cooperatives", Priority::High).with_batch_size(10),
            4,
        ),
        (
            SyncUnitConfig::new("crops", Priority::Medium).with_batch_size(25),
            60,
        ),
        (
            SyncUnitConfig::new("visits", Priority::Low)
                .with_batch_size(50)
                .with_marking(MarkingMode::PerRecord),
            120,
        ),
    ]);

    let report = world.coordinator().run_once().await.unwrap();
    assert_eq!(report.units_attempted, 4);
    assert_eq!(report.units_completed, 4);
    assert_eq!(report.records_uploaded, 334);

    for state in world.states.all().unwrap() {
        assert_eq!(state.status, SyncStatus::Completed, "unit {}", state.unit_name);
    }
}

#[tokio::test]
async fn state_survives_process_restart_with_file_store() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync_state.json");

    let store = Arc::new(MemoryUnitStore::new());
    store.insert(Record::new(vec![1]));
    let registry = Arc::new(
        UnitRegistry::builder()
            .register(
                SyncUnitConfig::new("farmers", Priority::High),
                Arc::clone(&store) as Arc<dyn UnitStore>,
            )
            .build(),
    );
    let remote = Arc::new(RemoteService::new());

    {
        let states = Arc::new(FileStateStore::open(&path).unwrap());
        let coordinator = SyncCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&states) as Arc<dyn SyncStateStore>,
            Arc::clone(&remote) as Arc<dyn RemoteTransport>,
        );
        coordinator.run_once().await.unwrap();
    }

    // A fresh process sees the recorded outcome.
    let states = FileStateStore::open(&path).unwrap();
    let row = states.get("farmers").unwrap().unwrap();
    assert_eq!(row.status, SyncStatus::Completed);
    assert!(row.last_sync_time.is_some());
}
