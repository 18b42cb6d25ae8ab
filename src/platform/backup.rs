use crate::models::{BackupJob, CredentialRef, DailySchedule, JobOptions, KeyRef, Repository};
use anyhow::Result;
use async_trait::async_trait;

/// Backup management service: jobs, repositories, keys, credentials.
///
/// Mutations are not always immediately visible to subsequent queries; the
/// engine inserts settle waits after provisioning calls rather than expecting
/// read-your-writes from implementations.
#[async_trait]
pub trait BackupService: Send + Sync {
    async fn find_job(&self, name: &str) -> Result<Option<BackupJob>>;

    /// Create a job bound to a machine entity and repository. The job name
    /// equals the machine short name.
    async fn create_job(&self, name: &str, repository: &str) -> Result<BackupJob>;

    async fn set_schedule(&self, job: &str, schedule: DailySchedule) -> Result<()>;

    async fn get_job_options(&self, job: &str) -> Result<JobOptions>;

    async fn set_job_options(&self, job: &str, options: &JobOptions) -> Result<()>;

    /// Advanced storage options: retention in days plus synthetic-full toggle.
    async fn set_advanced_options(
        &self,
        job: &str,
        retain_days: u32,
        disable_synthetic_fulls: bool,
    ) -> Result<()>;

    async fn set_encryption(&self, job: &str, enabled: bool, key: Option<&KeyRef>) -> Result<()>;

    async fn find_encryption_key(&self, label: &str) -> Result<Option<KeyRef>>;

    async fn find_repository(&self, name: &str) -> Result<Option<Repository>>;

    async fn create_repository(
        &self,
        name: &str,
        folder_path: &str,
        task_limit: u32,
    ) -> Result<Repository>;

    /// Enable or disable VSS-style application-aware processing.
    async fn set_vss_options(
        &self,
        job: &str,
        enabled: bool,
        credential: Option<&CredentialRef>,
    ) -> Result<()>;

    async fn find_credential(&self, name: &str) -> Result<Option<CredentialRef>>;
}
