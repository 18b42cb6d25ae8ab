//! Capability contracts for the external platforms the engine drives.
//!
//! The live site wiring implements these against the virtualization and
//! backup services; `snapshot` provides the in-memory implementation used
//! by the planner binary and the test suite.

pub mod backup;
pub mod inventory;
pub mod notify;
pub mod snapshot;

pub use backup::BackupService;
pub use inventory::InventoryService;
pub use notify::NotificationSink;
pub use snapshot::{FleetSnapshot, SnapshotMachine, SnapshotPlatform};
