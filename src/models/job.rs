use serde::{Deserialize, Serialize};

/// Handle to a platform encryption key, looked up by descriptive label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRef(pub String);

/// Handle to a named platform credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef(pub String);

/// Daily schedule: the job runs once per day at `hour:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub hour: u8,
}

impl DailySchedule {
    /// Off-hours slots the scheduler may pick from (18:00 through 05:00).
    pub const SLOTS: [u8; 12] = [18, 19, 20, 21, 22, 23, 0, 1, 2, 3, 4, 5];
}

/// Mutable configuration of a backup job, as read back from the service.
///
/// `retention_cycles` and `retention_days` are two fields of the same policy
/// in the backing job model; this engine always writes them together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobOptions {
    pub retention_cycles: u32,
    pub retention_days: u32,
    pub encryption_enabled: bool,
    pub encryption_key: Option<KeyRef>,
    pub vss_enabled: bool,
    pub vss_credential: Option<CredentialRef>,
}

/// A configured backup job in the backup management service.
///
/// Job names equal the machine short name; jobs are created once and only
/// ever updated afterwards — this engine never deletes one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupJob {
    pub name: String,
    pub repository: String,
    pub schedule: Option<DailySchedule>,
    #[serde(default)]
    pub options: JobOptions,
}
