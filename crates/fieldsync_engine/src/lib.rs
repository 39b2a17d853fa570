//! # FieldSync Engine
//!
//! Priority-tiered batch sync coordinator for FieldSync.
//!
//! This crate provides:
//! - Unit registry (name → typed storage adapter, resolved once at startup)
//! - Persisted per-unit sync state with upsert semantics
//! - Batch upload/download engine supporting batch-level and per-record
//!   marking flavors behind one contract
//! - Tier-ordered coordinator with concurrent fan-out inside each tier
//! - Retry-aware runner returning an explicit scheduler-facing outcome
//! - Remote transport abstraction with a mock for testing
//!
//! ## Architecture
//!
//! The coordinator partitions registered units into High, Medium, and Low
//! tiers and runs them in that fixed order: every unit in a tier syncs
//! concurrently, and the whole tier drains before the next tier starts.
//! Each unit's attempt follows the same sequence:
//!
//! 1. Persist `InProgress` state
//! 2. Download remote changes newer than the last successful sync
//! 3. Upload locally unsynced records in bounded batches
//! 4. Persist `Completed` (or `Unsynced` plus the error message on failure)
//!
//! ## Key Invariants
//!
//! - No lower-tier unit starts while a higher-tier task is outstanding
//! - A failing unit never erases a sibling's recorded outcome
//! - The first failure in a tier aborts all subsequent tiers
//! - Unit-level state reflects the most recent completed attempt, not
//!   record-level progress

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod coordinator;
mod error;
mod registry;
mod runner;
mod state;
mod transport;

pub use batch::BatchEngine;
pub use config::{CoordinatorConfig, MarkingMode, Priority, RunnerConfig, SyncUnitConfig};
pub use coordinator::{SyncCoordinator, SyncReport, UnitReport};
pub use error::{SyncError, SyncResult};
pub use registry::{UnitHandle, UnitRegistry, UnitRegistryBuilder};
pub use runner::{SyncOutcome, SyncRunner};
pub use state::{FileStateStore, MemoryStateStore, SyncState, SyncStateStore};
pub use transport::{MockTransport, RemoteTransport, TransportCall};
