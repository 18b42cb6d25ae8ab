//! Backup repository resolution and lazy provisioning.
//!
//! Repositories are keyed by target server/location and created at most
//! once: every resolution re-checks existence first, and a newly created
//! repository is re-fetched after a settle wait because the backing service
//! does not guarantee read-your-writes.

use crate::error::MachineError;
use crate::models::repository::repository_folder_path;
use crate::models::{FolderVariant, MachineTags, Repository, REPOSITORY_TASK_LIMIT};
use crate::state::RunContext;
use rand::seq::SliceRandom;

/// Location key for a machine, plus whether it was derived (not tag-supplied).
///
/// A derived key must be persisted back onto the machine as a backup-path
/// tag by the caller; the side effect stays at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationKey {
    pub key: String,
    pub derived: bool,
}

/// Resolve the repository location key for a machine.
///
/// Precedence: explicit backup-path tag; otherwise the site rule — at the
/// random-pool site one of the pool servers is picked uniformly, elsewhere
/// the key is the site code plus a fixed suffix.
pub async fn resolve_location_key(ctx: &RunContext, tags: &MachineTags, scope: &str) -> LocationKey {
    if let Some(path) = &tags.backup_path {
        return LocationKey {
            key: path.clone(),
            derived: false,
        };
    }

    let key = if scope.eq_ignore_ascii_case(&ctx.config.random_pool_site) {
        let mut rng = ctx.rng.lock().await;
        ctx.config
            .random_pool_servers
            .choose(&mut *rng)
            .cloned()
            .unwrap_or_else(|| format!("{scope}{}", ctx.config.derived_key_suffix))
    } else {
        format!("{scope}{}", ctx.config.derived_key_suffix)
    };

    LocationKey { key, derived: true }
}

/// Folder variant for a machine: the alternate-location tag selects the
/// secondary backup folder.
pub fn folder_variant(tags: &MachineTags) -> FolderVariant {
    if tags.alternate_location {
        FolderVariant::Alternate
    } else {
        FolderVariant::Primary
    }
}

/// Return the repository named `location_key`, provisioning it if absent.
///
/// Idempotent: repeated calls (and repeated runs) converge on one
/// repository per location key.
pub async fn resolve_repository(
    ctx: &RunContext,
    location_key: &str,
    variant: FolderVariant,
) -> Result<Repository, MachineError> {
    if let Some(existing) = ctx.backup.find_repository(location_key).await? {
        return Ok(existing);
    }

    let folder_path = repository_folder_path(location_key, variant);
    tracing::info!(repository = %location_key, folder = %folder_path, "Creating backup repository");
    ctx.backup
        .create_repository(location_key, &folder_path, REPOSITORY_TASK_LIMIT)
        .await?;

    // The service may not report the new repository immediately.
    tokio::time::sleep(ctx.config.settle_wait).await;

    ctx.backup
        .find_repository(location_key)
        .await?
        .ok_or_else(|| MachineError::RepositoryCreate {
            name: location_key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::platform::{FleetSnapshot, SnapshotPlatform};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> AppConfig {
        AppConfig {
            ledger_dir: std::env::temp_dir().join(format!(
                "reconciler-test-{}",
                uuid::Uuid::new_v4()
            )),
            settle_wait: Duration::from_millis(0),
            failure_backoff: Duration::from_millis(0),
            run_deadline: Duration::from_secs(3600),
            encryption_key_label: "Fleet backup encryption".into(),
            local_host: "recon01".into(),
            random_pool_site: "hq".into(),
            random_pool_servers: vec!["hq-bck01".into(), "hq-bck02".into(), "hq-bck03".into()],
            derived_key_suffix: "-bck01".into(),
            domain_credentials: vec![
                ("corp.example.com".into(), "svc-backup-corp".into()),
                ("dmz.example.com".into(), "svc-backup-dmz".into()),
            ],
            seed: Some(7),
        }
    }

    fn ctx_with(snapshot: FleetSnapshot) -> (RunContext, Arc<SnapshotPlatform>) {
        let platform = Arc::new(SnapshotPlatform::new(snapshot));
        let ctx = RunContext::new(
            platform.clone(),
            platform.clone(),
            platform.clone(),
            test_config(),
        )
        .unwrap();
        (ctx, platform)
    }

    #[tokio::test]
    async fn test_tagged_path_wins_over_site_rule() {
        let (ctx, _) = ctx_with(FleetSnapshot::default());
        let tags = MachineTags {
            backup_path: Some("ber-bck02".into()),
            ..MachineTags::default()
        };
        let key = resolve_location_key(&ctx, &tags, "hq").await;
        assert_eq!(key.key, "ber-bck02");
        assert!(!key.derived);
    }

    #[tokio::test]
    async fn test_derived_key_outside_pool_site() {
        let (ctx, _) = ctx_with(FleetSnapshot::default());
        let key = resolve_location_key(&ctx, &MachineTags::default(), "berlin").await;
        assert_eq!(key.key, "berlin-bck01");
        assert!(key.derived);
    }

    #[tokio::test]
    async fn test_pool_site_picks_a_pool_server() {
        let (ctx, _) = ctx_with(FleetSnapshot::default());
        let key = resolve_location_key(&ctx, &MachineTags::default(), "hq").await;
        assert!(ctx.config.random_pool_servers.contains(&key.key));
        assert!(key.derived);
    }

    #[tokio::test]
    async fn test_resolve_creates_then_reuses_repository() {
        let (ctx, platform) = ctx_with(FleetSnapshot::default());

        let first = resolve_repository(&ctx, "berlin-bck01", FolderVariant::Primary)
            .await
            .unwrap();
        assert_eq!(first.folder_path, "berlin-bck01/backups/vbk");
        assert_eq!(first.task_limit, REPOSITORY_TASK_LIMIT);
        assert_eq!(platform.repository_count().await, 1);

        let second = resolve_repository(&ctx, "berlin-bck01", FolderVariant::Primary)
            .await
            .unwrap();
        assert_eq!(second.name, first.name);
        assert_eq!(platform.repository_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_failure_is_machine_error() {
        let (ctx, platform) = ctx_with(FleetSnapshot::default());
        platform.fail_repository_creates(true).await;

        let err = resolve_repository(&ctx, "berlin-bck01", FolderVariant::Primary)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
