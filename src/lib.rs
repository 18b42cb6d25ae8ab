//! Tag-driven backup job reconciliation.
//!
//! Reconciles a fleet of virtual machines against the backup policy
//! declared as tags on each machine: eligible machines get a correctly
//! configured backup job (repository, schedule, retention, encryption,
//! application awareness) in the backup management service, and existing
//! jobs are corrected when their retention or encryption drifts from the
//! tagged policy.
//!
//! The engine talks to the platforms through the traits in [`platform`];
//! site wiring implements them against the live services, while
//! [`platform::SnapshotPlatform`] serves a captured fleet for offline
//! planning and tests. A run is single-pass and sequential: machines are
//! processed in name order, each inside its own fault boundary, with
//! failures recorded in an append-only ledger.

pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod platform;
pub mod services;
pub mod state;

pub use config::AppConfig;
pub use error::{FatalRunError, MachineError};
pub use models::{ReconcileOutcome, RunReport};
pub use services::runner::run;
pub use state::RunContext;
