//! Configuration for sync units, the coordinator, and the runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Priority tier of a sync unit.
///
/// Tiers run strictly in `High`, `Medium`, `Low` order: a tier fully drains
/// before the next one starts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// Synced first.
    High,
    /// Synced after every high-priority unit has finished.
    Medium,
    /// Synced last.
    Low,
}

impl Priority {
    /// The fixed execution order of the tiers.
    pub const ORDER: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// How a unit's storage adapter tracks upload progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum MarkingMode {
    /// The whole fetched batch is marked synced after one remote call
    /// succeeds; the next fetch excludes marked records, so no cursor is
    /// needed (relational-store style).
    #[default]
    Batch,
    /// Records are uploaded and marked one at a time, so fetches page with
    /// an explicit skip cursor advanced by the batch size; the loop ends on
    /// the first short page (document-store style).
    PerRecord,
}

/// Static configuration of one sync unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUnitConfig {
    /// Unique unit name (table or collection).
    pub name: String,
    /// Maximum records per remote round trip.
    pub batch_size: u32,
    /// Priority tier.
    pub priority: Priority,
    /// Upload progress tracking flavor.
    pub marking: MarkingMode,
}

impl SyncUnitConfig {
    /// Creates a unit config with the default batch size of 100 and
    /// batch-level marking.
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            batch_size: 100,
            priority,
            marking: MarkingMode::Batch,
        }
    }

    /// Sets the batch size.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero; a zero batch would never terminate.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        self.batch_size = batch_size;
        self
    }

    /// Sets the marking mode.
    #[must_use]
    pub fn with_marking(mut self, marking: MarkingMode) -> Self {
        self.marking = marking;
        self
    }
}

/// Configuration for the sync coordinator.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Optional deadline for a single unit's attempt.
    ///
    /// Off by default: a stuck remote call stalls its tier, matching the
    /// behavior of deployments that predate this knob.
    pub unit_timeout: Option<Duration>,
}

impl CoordinatorConfig {
    /// Creates a coordinator configuration with no per-unit timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a per-unit timeout.
    #[must_use]
    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = Some(timeout);
        self
    }
}

/// Configuration for the retry-aware runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Attempt budget before a failed run is reported as permanent.
    pub max_attempts: u32,
}

impl RunnerConfig {
    /// Creates a runner configuration with the given attempt budget.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
