pub mod job;
pub mod machine;
pub mod outcome;
pub mod repository;

pub use job::{BackupJob, CredentialRef, DailySchedule, JobOptions, KeyRef};
pub use machine::{GuestOs, LocationNode, Machine, MachineTags, PowerState};
pub use outcome::{AwarenessOutcome, ReconcileOutcome, RunReport};
pub use repository::{FolderVariant, Repository, REPOSITORY_TASK_LIMIT};
