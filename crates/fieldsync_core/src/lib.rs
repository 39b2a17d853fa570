//! # FieldSync Core
//!
//! Record domain and storage adapter contract for FieldSync.
//!
//! This crate provides:
//! - Record types with per-record sync status
//! - The [`UnitStore`] adapter trait the sync engine consumes
//! - An in-memory store implementation
//!
//! ## Key Invariants
//!
//! - Records are created `Unsynced` by the domain write path
//! - A record's status only moves `Unsynced → InProgress → Completed`;
//!   any local edit after `Completed` resets it to `Unsynced`
//! - `UnitStore` reads observe preceding writes from the same task
//!   (read-after-write), which the engine's batch termination relies on

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod store;
mod types;

pub use error::{CoreError, CoreResult};
pub use store::{MemoryUnitStore, UnitStore};
pub use types::{now_ms, Record, RecordId, SyncStatus};
