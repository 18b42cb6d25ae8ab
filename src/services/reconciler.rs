//! Per-machine reconciliation: create a missing job from tag state, or
//! bring an existing job's retention and encryption back into agreement
//! with the machine's current tags.
//!
//! Update passes never touch schedule, repository, or application
//! awareness — those are create-time decisions, a deliberate scope limit.

use crate::error::MachineError;
use crate::models::machine::{TAG_BACKUP_PATH, TAG_RETENTION};
use crate::models::{AwarenessOutcome, DailySchedule, Machine, MachineTags, ReconcileOutcome};
use crate::services::repository_resolver::{folder_variant, resolve_location_key, resolve_repository};
use crate::services::retention::{self, Retention, DEFAULT_RETENTION_TAG};
use crate::state::RunContext;
use rand::seq::SliceRandom;

/// Reconcile one machine against its declared backup policy.
///
/// The no-backup marker tag is authoritative on its own: when set, the
/// machine is never touched regardless of its retention class.
pub async fn reconcile_machine(
    ctx: &RunContext,
    machine: &Machine,
    scope: &str,
) -> Result<ReconcileOutcome, MachineError> {
    if machine.tags.no_backup {
        tracing::info!(machine = %machine.name, "No-backup marker set, leaving machine alone");
        return Ok(ReconcileOutcome::SkippedNoBackup);
    }

    match ctx.backup.find_job(&machine.name).await? {
        Some(job) => update_job(ctx, machine, &job.name).await,
        None => create_job(ctx, machine, scope).await,
    }
}

async fn create_job(
    ctx: &RunContext,
    machine: &Machine,
    scope: &str,
) -> Result<ReconcileOutcome, MachineError> {
    let resolution = retention::resolve(machine.tags.retention.as_deref());
    let Some(days) = resolution.retention.days() else {
        tracing::info!(machine = %machine.name, "Retention class is no-backup, not creating a job");
        return Ok(ReconcileOutcome::SkippedNoBackup);
    };

    let location = resolve_location_key(ctx, &machine.tags, scope).await;
    if location.derived {
        ctx.inventory
            .set_tag(&machine.name, TAG_BACKUP_PATH, &location.key)
            .await?;
    }

    let repository =
        resolve_repository(ctx, &location.key, folder_variant(&machine.tags)).await?;

    let job = ctx.backup.create_job(&machine.name, &repository.name).await?;
    tracing::info!(machine = %machine.name, repository = %repository.name, "Created backup job");

    let hour = pick_schedule_slot(ctx).await;
    ctx.backup
        .set_schedule(&job.name, DailySchedule { hour })
        .await?;

    let mut options = ctx.backup.get_job_options(&job.name).await?;
    options.retention_cycles = days;
    options.retention_days = days;
    write_options(ctx, &job.name, &options, days).await?;

    let key = ctx
        .backup
        .find_encryption_key(&ctx.config.encryption_key_label)
        .await?
        .ok_or_else(|| MachineError::EncryptionKeyMissing {
            label: ctx.config.encryption_key_label.clone(),
        })?;
    ctx.backup.set_encryption(&job.name, true, Some(&key)).await?;

    let awareness = configure_awareness(ctx, machine, &job.name).await?;

    if resolution.defaulted {
        ctx.inventory
            .set_tag(&machine.name, TAG_RETENTION, DEFAULT_RETENTION_TAG)
            .await?;
        ctx.notify(
            &machine.name,
            "default retention 3-days applied, review backup tags",
        )
        .await;
    }

    Ok(ReconcileOutcome::Created {
        defaulted_retention: resolution.defaulted,
        awareness,
    })
}

async fn update_job(
    ctx: &RunContext,
    machine: &Machine,
    job_name: &str,
) -> Result<ReconcileOutcome, MachineError> {
    // Tags may have changed since the inventory listing; re-resolve live.
    let raw = ctx.inventory.get_tags(&machine.name).await?;
    let tags = MachineTags::classify(&raw);
    if tags.no_backup {
        tracing::info!(machine = %machine.name, "No-backup marker set live, leaving job untouched");
        return Ok(ReconcileOutcome::SkippedNoBackup);
    }
    let resolution = retention::resolve(tags.retention.as_deref());

    let days = match resolution.retention {
        Retention::Days(d) => d,
        Retention::Disabled => {
            tracing::info!(machine = %machine.name, "Retention class is no-backup, leaving job untouched");
            return Ok(ReconcileOutcome::SkippedNoBackup);
        }
    };

    let options = ctx.backup.get_job_options(job_name).await?;

    let retention_drifted =
        options.retention_cycles != days || options.retention_days != days;
    if retention_drifted {
        tracing::info!(
            machine = %machine.name,
            current_cycles = options.retention_cycles,
            current_days = options.retention_days,
            desired = days,
            "Correcting retention drift"
        );
        let mut corrected = options.clone();
        corrected.retention_cycles = days;
        corrected.retention_days = days;
        write_options(ctx, job_name, &corrected, days).await?;
    }

    let enabled_encryption = if options.encryption_enabled {
        false
    } else {
        // One-directional: encryption is enabled when missing, never disabled.
        let key = ctx
            .backup
            .find_encryption_key(&ctx.config.encryption_key_label)
            .await?
            .ok_or_else(|| MachineError::EncryptionKeyMissing {
                label: ctx.config.encryption_key_label.clone(),
            })?;
        ctx.backup.set_encryption(job_name, true, Some(&key)).await?;
        tracing::info!(machine = %machine.name, "Enabled missing job encryption");
        true
    };

    Ok(match (retention_drifted, enabled_encryption) {
        (false, false) => ReconcileOutcome::NoChange,
        (true, false) => ReconcileOutcome::RetentionUpdated,
        (false, true) => ReconcileOutcome::EncryptionUpdated,
        (true, true) => ReconcileOutcome::RetentionAndEncryptionUpdated,
    })
}

/// Write retention through both surfaces: the job options pair and the
/// advanced storage options (with synthetic fulls off).
async fn write_options(
    ctx: &RunContext,
    job: &str,
    options: &crate::models::JobOptions,
    days: u32,
) -> Result<(), MachineError> {
    ctx.backup
        .set_job_options(job, options)
        .await
        .map_err(|e| MachineError::JobOptionWrite {
            job: job.to_string(),
            detail: e.to_string(),
        })?;
    ctx.backup
        .set_advanced_options(job, days, true)
        .await
        .map_err(|e| MachineError::JobOptionWrite {
            job: job.to_string(),
            detail: e.to_string(),
        })?;
    Ok(())
}

async fn pick_schedule_slot(ctx: &RunContext) -> u8 {
    let mut rng = ctx.rng.lock().await;
    DailySchedule::SLOTS.choose(&mut *rng).copied().unwrap_or(22)
}

/// Settle application-aware processing for a new job.
///
/// Windows guests get VSS with the credential of their matched domain.
/// An unmatched domain (or a matched domain whose credential is missing
/// from the store) is a named no-op: awareness stays off, the job stands.
/// Non-Windows guests that somehow carry integration get it switched off.
async fn configure_awareness(
    ctx: &RunContext,
    machine: &Machine,
    job_name: &str,
) -> Result<AwarenessOutcome, MachineError> {
    if !machine.guest_os.is_windows() {
        let options = ctx.backup.get_job_options(job_name).await?;
        if options.vss_enabled {
            ctx.backup.set_vss_options(job_name, false, None).await?;
            return Ok(AwarenessOutcome::Disabled);
        }
        return Ok(AwarenessOutcome::NotWindows);
    }

    let Some(hostname) = machine.guest_hostname.as_deref() else {
        return Ok(AwarenessOutcome::SkippedDomainUnmatched);
    };

    let matched = ctx
        .config
        .domain_credentials
        .iter()
        .find(|(suffix, _)| hostname.to_lowercase().ends_with(&suffix.to_lowercase()));
    let Some((domain, credential_name)) = matched else {
        tracing::debug!(machine = %machine.name, hostname = %hostname, "Guest domain unmatched, awareness left off");
        return Ok(AwarenessOutcome::SkippedDomainUnmatched);
    };

    let Some(credential) = ctx.backup.find_credential(credential_name).await? else {
        tracing::warn!(machine = %machine.name, credential = %credential_name, "Domain credential missing, awareness left off");
        return Ok(AwarenessOutcome::SkippedDomainUnmatched);
    };

    ctx.backup
        .set_vss_options(job_name, true, Some(&credential))
        .await?;
    Ok(AwarenessOutcome::Enabled {
        domain: domain.clone(),
    })
}
