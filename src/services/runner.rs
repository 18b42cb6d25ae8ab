//! Batch run: scope resolution, the sequential machine loop, and the
//! per-machine fault boundary.
//!
//! One bad machine never aborts the batch — its failure is recorded in the
//! ledger and the loop moves on after a short backoff. Only scope or
//! inventory resolution aborts the whole run.

use crate::error::FatalRunError;
use crate::models::{ReconcileOutcome, RunReport};
use crate::services::{filter, reconciler};
use crate::state::RunContext;
use std::time::Instant;

/// Execute one full reconciliation pass.
pub async fn run(ctx: &RunContext) -> Result<RunReport, FatalRunError> {
    let scope = filter::resolve_scope(ctx).await?;
    let machines = filter::eligible_machines(ctx, &scope).await?;

    let run_id = ctx.ledger.lock().await.run_id().to_string();
    let mut report = RunReport::new(run_id, scope.clone());
    let started = Instant::now();

    for machine in &machines {
        if started.elapsed() >= ctx.config.run_deadline {
            tracing::warn!(
                processed = report.outcomes.len(),
                remaining = machines.len() - report.outcomes.len(),
                "Run deadline reached, stopping batch"
            );
            break;
        }

        match reconciler::reconcile_machine(ctx, machine, &scope).await {
            Ok(outcome) => {
                tracing::info!(machine = %machine.name, outcome = ?outcome, "Machine reconciled");
                report.record(&machine.name, outcome);
            }
            Err(e) => {
                tracing::error!(machine = %machine.name, error = %e, "Machine reconciliation failed");
                let detail = e.to_string();
                if let Err(io) = ctx
                    .ledger
                    .lock()
                    .await
                    .record_failure(&machine.name, &detail)
                {
                    tracing::warn!(machine = %machine.name, error = %io, "Could not write failure ledger entry");
                }
                report.record(&machine.name, ReconcileOutcome::Failed(detail));
                // Give a rate-limited backing service room before the next machine.
                tokio::time::sleep(ctx.config.failure_backoff).await;
            }
        }
    }

    tracing::info!(
        scope = %scope,
        machines = report.outcomes.len(),
        failed = report.failed.len(),
        "Reconciliation run finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::machine::{GuestOs, PowerState, TAG_NO_BACKUP, TAG_RETENTION};
    use crate::models::{BackupJob, DailySchedule, JobOptions};
    use crate::platform::{FleetSnapshot, SnapshotMachine, SnapshotPlatform};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(ledger_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            ledger_dir: ledger_dir.to_path_buf(),
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
            seed: Some(11),
        }
    }

    fn machine(name: &str, tags: &[(&str, &str)]) -> SnapshotMachine {
        SnapshotMachine {
            name: name.into(),
            guest_os: GuestOs::Windows,
            guest_hostname: Some(format!("{}.corp.example.com", name.to_lowercase())),
            power_state: PowerState::PoweredOn,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            location: vec!["esx-cl-a".into(), "berlin".into(), "root".into()],
        }
    }

    /// The reconciler's own VM: anchors the scope walk, opted out of backup.
    fn local_host() -> SnapshotMachine {
        machine("recon01", &[(TAG_NO_BACKUP, "true")])
    }

    fn fleet(mut machines: Vec<SnapshotMachine>) -> FleetSnapshot {
        machines.push(local_host());
        FleetSnapshot {
            machines,
            encryption_keys: vec!["Fleet backup encryption".into()],
            credentials: vec!["svc-backup-corp".into(), "svc-backup-dmz".into()],
            ..FleetSnapshot::default()
        }
    }

    fn existing_job(name: &str, days: u32) -> BackupJob {
        BackupJob {
            name: name.into(),
            repository: "berlin-bck01".into(),
            schedule: Some(DailySchedule { hour: 23 }),
            options: JobOptions {
                retention_cycles: days,
                retention_days: days,
                encryption_enabled: true,
                ..JobOptions::default()
            },
        }
    }

    fn build(snapshot: FleetSnapshot, dir: &TempDir) -> (RunContext, Arc<SnapshotPlatform>) {
        let platform = Arc::new(SnapshotPlatform::new(snapshot));
        let ctx = RunContext::new(
            platform.clone(),
            platform.clone(),
            platform.clone(),
            test_config(dir.path()),
        )
        .unwrap();
        (ctx, platform)
    }

    #[tokio::test]
    async fn test_failed_machine_does_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        let mut snapshot = fleet(vec![
            machine("ALPHA1", &[(TAG_RETENTION, "1-week")]),
            machine("DB03", &[(TAG_RETENTION, "1-month")]),
            machine("ZULU1", &[(TAG_RETENTION, "1-week")]),
        ]);
        snapshot.jobs.push(existing_job("ALPHA1", 7));
        snapshot.jobs.push(existing_job("ZULU1", 7));
        let (ctx, platform) = build(snapshot, &dir);

        // DB03 is the only create; repository provisioning is down.
        platform.fail_repository_creates(true).await;

        let report = run(&ctx).await.unwrap();

        assert_eq!(report.failed, vec!["DB03"]);
        assert!(matches!(
            report.outcome_for("DB03"),
            Some(ReconcileOutcome::Failed(_))
        ));
        // Processing continued in sorted order past the failure.
        assert_eq!(report.outcome_for("ZULU1"), Some(&ReconcileOutcome::NoChange));

        let ledger = std::fs::read_to_string(
            dir.path().join(format!("failures-{}.log", report.run_id)),
        )
        .unwrap();
        assert!(ledger.contains("DB03"));
        let stamp = ledger.split('\t').next().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn test_scope_failure_aborts_before_processing() {
        let dir = TempDir::new().unwrap();
        // No recon01 registration at all: the ancestor walk finds nothing.
        let snapshot = FleetSnapshot {
            machines: vec![machine("WEB01", &[])],
            encryption_keys: vec!["Fleet backup encryption".into()],
            ..FleetSnapshot::default()
        };
        let (ctx, platform) = build(snapshot, &dir);

        let err = run(&ctx).await.unwrap_err();
        assert!(matches!(err, FatalRunError::ScopeResolution { .. }));
        assert!(platform.job("WEB01").await.is_none());

        // Run-level abort: the ledger stays empty.
        let batch_files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("failures-"))
            .collect();
        assert!(batch_files.is_empty());
    }

    #[tokio::test]
    async fn test_exclusions_and_sorted_processing() {
        let dir = TempDir::new().unwrap();
        let mut off = machine("ZIGGY", &[(TAG_RETENTION, "1-week")]);
        off.power_state = PowerState::PoweredOff;
        let snapshot = fleet(vec![
            machine("WEB01", &[(TAG_RETENTION, "1-week")]),
            machine("template-gold", &[]),
            machine("app-01", &[]),
            machine("sql-bkup-relay", &[]),
            machine("OPTED0UT", &[(TAG_NO_BACKUP, "true")]),
            off,
            machine("ABACUS", &[(TAG_RETENTION, "1-week")]),
        ]);
        let (ctx, platform) = build(snapshot, &dir);

        let report = run(&ctx).await.unwrap();

        let names: Vec<_> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["ABACUS", "WEB01"], "sorted, exclusions applied");
        assert!(platform.job("OPTED0UT").await.is_none());
        assert!(platform.job("template-gold").await.is_none());
    }

    #[tokio::test]
    async fn test_run_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let snapshot = fleet(vec![machine("WEB01", &[(TAG_RETENTION, "2-weeks")])]);
        let (ctx, platform) = build(snapshot, &dir);

        let first = run(&ctx).await.unwrap();
        assert!(matches!(
            first.outcome_for("WEB01"),
            Some(ReconcileOutcome::Created { .. })
        ));

        platform.clear_mutations().await;
        let second = run(&ctx).await.unwrap();
        assert_eq!(second.outcome_for("WEB01"), Some(&ReconcileOutcome::NoChange));
        assert!(platform.mutations().await.is_empty());
        assert_eq!(platform.repository_count().await, 1);
    }

    #[tokio::test]
    async fn test_deadline_stops_batch_early() {
        let dir = TempDir::new().unwrap();
        let snapshot = fleet(vec![machine("WEB01", &[(TAG_RETENTION, "1-week")])]);
        let (ctx, platform) = {
            let platform = Arc::new(SnapshotPlatform::new(snapshot));
            let mut config = test_config(dir.path());
            config.run_deadline = Duration::from_secs(0);
            let ctx = RunContext::new(
                platform.clone(),
                platform.clone(),
                platform.clone(),
                config,
            )
            .unwrap();
            (ctx, platform)
        };

        let report = run(&ctx).await.unwrap();
        assert!(report.outcomes.is_empty());
        assert!(platform.job("WEB01").await.is_none());
    }
}
