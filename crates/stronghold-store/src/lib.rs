//! Durable JSON world snapshots for the Stronghold city simulation.
//!
//! Snapshots live under `<data_dir>/snapshots/` as timestamped,
//! pretty-printed JSON files. A `latest` marker in `<data_dir>` names the
//! newest complete one. Writes are atomic: a snapshot is fully written and
//! fsynced under a temporary name before it is renamed into place, and the
//! marker is swapped the same way.
//!
//! # Modules
//!
//! - [`error`] -- Error types for persistence.
//! - [`snapshot_store`] -- Save, restore, list and rotate snapshots.

pub mod error;
pub mod snapshot_store;

pub use error::StoreError;
pub use snapshot_store::SnapshotStore;
