//! In-memory platform backed by a fleet snapshot.
//!
//! A snapshot captures the machines (with raw tags and location chains),
//! existing jobs, repositories, key labels, and credential names of an
//! environment. `SnapshotPlatform` serves it through the collaborator
//! traits so the planner binary and the test suite run the exact engine
//! code the live wiring runs.

use crate::models::machine::{GuestOs, LocationNode, Machine, MachineTags, PowerState};
use crate::models::{BackupJob, CredentialRef, DailySchedule, JobOptions, KeyRef, Repository};
use crate::platform::{BackupService, InventoryService, NotificationSink};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// One machine in a fleet snapshot. Tags are the raw category -> value map;
/// `location` is the ancestor chain, leaf first, hierarchy root last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMachine {
    pub name: String,
    pub guest_os: GuestOs,
    #[serde(default)]
    pub guest_hostname: Option<String>,
    pub power_state: PowerState,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub location: Vec<String>,
}

/// Serializable capture of a fleet plus backup-service state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub machines: Vec<SnapshotMachine>,
    #[serde(default)]
    pub jobs: Vec<BackupJob>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub encryption_keys: Vec<String>,
    #[serde(default)]
    pub credentials: Vec<String>,
}

#[derive(Debug, Default)]
struct SnapshotState {
    machines: Vec<SnapshotMachine>,
    jobs: HashMap<String, BackupJob>,
    repositories: HashMap<String, Repository>,
    encryption_keys: Vec<String>,
    credentials: Vec<String>,
    notifications: Vec<(String, String)>,
    /// Journal of every mutating call, for the planner summary and for
    /// zero-write assertions in tests.
    mutations: Vec<String>,
    fail_repository_creates: bool,
    fail_tag_lookups: bool,
}

/// In-memory implementation of all three collaborator traits.
pub struct SnapshotPlatform {
    state: Mutex<SnapshotState>,
}

impl SnapshotPlatform {
    pub fn new(snapshot: FleetSnapshot) -> Self {
        let jobs = snapshot
            .jobs
            .into_iter()
            .map(|j| (j.name.clone(), j))
            .collect();
        let repositories = snapshot
            .repositories
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();
        Self {
            state: Mutex::new(SnapshotState {
                machines: snapshot.machines,
                jobs,
                repositories,
                encryption_keys: snapshot.encryption_keys,
                credentials: snapshot.credentials,
                ..SnapshotState::default()
            }),
        }
    }

    /// Make every `create_repository` call fail, simulating an unreachable
    /// backing service.
    pub async fn fail_repository_creates(&self, fail: bool) {
        self.state.lock().await.fail_repository_creates = fail;
    }

    /// Make every `get_tags` call fail, simulating a transient tag-service
    /// outage.
    pub async fn fail_tag_lookups(&self, fail: bool) {
        self.state.lock().await.fail_tag_lookups = fail;
    }

    pub async fn job(&self, name: &str) -> Option<BackupJob> {
        self.state.lock().await.jobs.get(name).cloned()
    }

    pub async fn repository_count(&self) -> usize {
        self.state.lock().await.repositories.len()
    }

    pub async fn notifications(&self) -> Vec<(String, String)> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn tag_value(&self, machine: &str, category: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .machines
            .iter()
            .find(|m| m.name == machine)
            .and_then(|m| m.tags.get(category).cloned())
    }

    /// Mutation journal since construction (or since `clear_mutations`).
    pub async fn mutations(&self) -> Vec<String> {
        self.state.lock().await.mutations.clone()
    }

    pub async fn clear_mutations(&self) {
        self.state.lock().await.mutations.clear();
    }
}

#[async_trait]
impl InventoryService for SnapshotPlatform {
    async fn list_machines(&self, scope: &str) -> Result<Vec<Machine>> {
        let state = self.state.lock().await;
        Ok(state
            .machines
            .iter()
            .filter(|m| m.location.iter().any(|node| node == scope))
            .map(|m| Machine {
                name: m.name.clone(),
                guest_os: m.guest_os,
                guest_hostname: m.guest_hostname.clone(),
                power_state: m.power_state,
                tags: MachineTags::classify(&m.tags),
            })
            .collect())
    }

    async fn location_ancestors(&self, machine: &str) -> Result<Vec<LocationNode>> {
        let state = self.state.lock().await;
        let Some(m) = state.machines.iter().find(|m| m.name == machine) else {
            return Ok(Vec::new());
        };
        Ok(m.location
            .iter()
            .enumerate()
            .map(|(i, name)| LocationNode {
                name: name.clone(),
                parent: m.location.get(i + 1).cloned(),
            })
            .collect())
    }

    async fn get_tags(&self, machine: &str) -> Result<HashMap<String, String>> {
        let state = self.state.lock().await;
        if state.fail_tag_lookups {
            anyhow::bail!("tag service unavailable");
        }
        Ok(state
            .machines
            .iter()
            .find(|m| m.name == machine)
            .map(|m| m.tags.clone())
            .unwrap_or_default())
    }

    async fn set_tag(&self, machine: &str, category: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .mutations
            .push(format!("set_tag:{machine}:{category}={value}"));
        if let Some(m) = state.machines.iter_mut().find(|m| m.name == machine) {
            m.tags.insert(category.to_string(), value.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl BackupService for SnapshotPlatform {
    async fn find_job(&self, name: &str) -> Result<Option<BackupJob>> {
        Ok(self.state.lock().await.jobs.get(name).cloned())
    }

    async fn create_job(&self, name: &str, repository: &str) -> Result<BackupJob> {
        let mut state = self.state.lock().await;
        state.mutations.push(format!("create_job:{name}"));
        let job = BackupJob {
            name: name.to_string(),
            repository: repository.to_string(),
            schedule: None,
            options: JobOptions::default(),
        };
        state.jobs.insert(name.to_string(), job.clone());
        Ok(job)
    }

    async fn set_schedule(&self, job: &str, schedule: DailySchedule) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .mutations
            .push(format!("set_schedule:{job}:{:02}:00", schedule.hour));
        if let Some(j) = state.jobs.get_mut(job) {
            j.schedule = Some(schedule);
        }
        Ok(())
    }

    async fn get_job_options(&self, job: &str) -> Result<JobOptions> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .get(job)
            .map(|j| j.options.clone())
            .unwrap_or_default())
    }

    async fn set_job_options(&self, job: &str, options: &JobOptions) -> Result<()> {
        let mut state = self.state.lock().await;
        state.mutations.push(format!("set_job_options:{job}"));
        if let Some(j) = state.jobs.get_mut(job) {
            j.options = options.clone();
        }
        Ok(())
    }

    async fn set_advanced_options(
        &self,
        job: &str,
        retain_days: u32,
        _disable_synthetic_fulls: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .mutations
            .push(format!("set_advanced_options:{job}:{retain_days}"));
        if let Some(j) = state.jobs.get_mut(job) {
            j.options.retention_days = retain_days;
        }
        Ok(())
    }

    async fn set_encryption(&self, job: &str, enabled: bool, key: Option<&KeyRef>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.mutations.push(format!("set_encryption:{job}:{enabled}"));
        if let Some(j) = state.jobs.get_mut(job) {
            j.options.encryption_enabled = enabled;
            j.options.encryption_key = key.cloned();
        }
        Ok(())
    }

    async fn find_encryption_key(&self, label: &str) -> Result<Option<KeyRef>> {
        let state = self.state.lock().await;
        Ok(state
            .encryption_keys
            .iter()
            .find(|l| l.as_str() == label)
            .map(|l| KeyRef(l.clone())))
    }

    async fn find_repository(&self, name: &str) -> Result<Option<Repository>> {
        Ok(self.state.lock().await.repositories.get(name).cloned())
    }

    async fn create_repository(
        &self,
        name: &str,
        folder_path: &str,
        task_limit: u32,
    ) -> Result<Repository> {
        let mut state = self.state.lock().await;
        if state.fail_repository_creates {
            anyhow::bail!("backup service unavailable");
        }
        state.mutations.push(format!("create_repository:{name}"));
        let repo = Repository {
            name: name.to_string(),
            folder_path: folder_path.to_string(),
            task_limit,
        };
        state.repositories.insert(name.to_string(), repo.clone());
        Ok(repo)
    }

    async fn set_vss_options(
        &self,
        job: &str,
        enabled: bool,
        credential: Option<&CredentialRef>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.mutations.push(format!("set_vss_options:{job}:{enabled}"));
        if let Some(j) = state.jobs.get_mut(job) {
            j.options.vss_enabled = enabled;
            j.options.vss_credential = credential.cloned();
        }
        Ok(())
    }

    async fn find_credential(&self, name: &str) -> Result<Option<CredentialRef>> {
        let state = self.state.lock().await;
        Ok(state
            .credentials
            .iter()
            .find(|c| c.as_str() == name)
            .map(|c| CredentialRef(c.clone())))
    }
}

#[async_trait]
impl NotificationSink for SnapshotPlatform {
    async fn notify(&self, machine: &str, reason: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .notifications
            .push((machine.to_string(), reason.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_one_machine() -> FleetSnapshot {
        FleetSnapshot {
            machines: vec![SnapshotMachine {
                name: "WEB01".into(),
                guest_os: GuestOs::Windows,
                guest_hostname: Some("web01.corp.example.com".into()),
                power_state: PowerState::PoweredOn,
                tags: HashMap::new(),
                location: vec!["esx-cl-a".into(), "berlin".into(), "root".into()],
            }],
            ..FleetSnapshot::default()
        }
    }

    #[tokio::test]
    async fn test_list_machines_filters_by_scope() {
        let platform = SnapshotPlatform::new(snapshot_with_one_machine());
        let in_scope = platform.list_machines("berlin").await.unwrap();
        assert_eq!(in_scope.len(), 1);
        let out_of_scope = platform.list_machines("munich").await.unwrap();
        assert!(out_of_scope.is_empty());
    }

    #[tokio::test]
    async fn test_location_ancestors_chain() {
        let platform = SnapshotPlatform::new(snapshot_with_one_machine());
        let chain = platform.location_ancestors("WEB01").await.unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[1].name, "berlin");
        assert_eq!(chain[1].parent.as_deref(), Some("root"));
        assert!(chain[2].parent.is_none());
    }

    #[tokio::test]
    async fn test_set_tag_visible_in_live_lookup() {
        let platform = SnapshotPlatform::new(snapshot_with_one_machine());
        platform
            .set_tag("WEB01", "backup_retention", "3-days")
            .await
            .unwrap();
        let tags = platform.get_tags("WEB01").await.unwrap();
        assert_eq!(tags.get("backup_retention").map(String::as_str), Some("3-days"));
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_json() {
        let snapshot = snapshot_with_one_machine();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: FleetSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.machines[0].name, "WEB01");
    }
}
