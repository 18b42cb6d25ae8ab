//! Inventory scoping and eligibility.
//!
//! The run is bounded to one datacenter, found by walking the local host's
//! location ancestors up to the node directly under the hierarchy root.
//! Eligibility is a short-circuit predicate chain over each machine, with
//! all name matching concentrated in one classification function.

use crate::error::FatalRunError;
use crate::models::{Machine, MachineTags, PowerState};
use crate::state::RunContext;

/// Name prefix reserved for machine templates.
const TEMPLATE_PREFIX: &str = "template";

/// Substrings that mark infrastructure, scratch, or legacy machines which
/// never receive backup jobs. All matches are case-insensitive.
const DENY_SUBSTRINGS: &[&str] = &["bkup", "test", "rdx", "-old", "esx"];

/// Resolve the datacenter scope for this run.
///
/// Walks the local host's ancestor chain for the node whose parent is the
/// hierarchy root. Failure here is fatal: no machines are processed.
pub async fn resolve_scope(ctx: &RunContext) -> Result<String, FatalRunError> {
    let host = ctx.config.local_host.clone();
    let ancestors = ctx
        .inventory
        .location_ancestors(&host)
        .await
        .map_err(|e| FatalRunError::ScopeResolution {
            host: host.clone(),
            detail: e.to_string(),
        })?;

    let root = ancestors
        .iter()
        .find(|node| node.parent.is_none())
        .ok_or_else(|| FatalRunError::ScopeResolution {
            host: host.clone(),
            detail: "ancestor chain has no root".into(),
        })?;

    let datacenter = ancestors
        .iter()
        .find(|node| node.parent.as_deref() == Some(root.name.as_str()))
        .ok_or_else(|| FatalRunError::ScopeResolution {
            host: host.clone(),
            detail: "no ancestor directly under the hierarchy root".into(),
        })?;

    tracing::info!(host = %host, scope = %datacenter.name, "Resolved datacenter scope");
    Ok(datacenter.name.clone())
}

/// True when a machine name alone disqualifies it from backup.
pub fn name_excluded(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower.starts_with(TEMPLATE_PREFIX) {
        return true;
    }
    if has_decommission_suffix(&lower) {
        return true;
    }
    DENY_SUBSTRINGS.iter().any(|s| lower.contains(*s))
}

/// Decommission staging convention: a dash followed by exactly two digits at
/// the end of the name (`app-01`). Plain trailing digits (`WEB01`) are fine.
fn has_decommission_suffix(name: &str) -> bool {
    let bytes = name.as_bytes();
    let n = bytes.len();
    n >= 3
        && bytes[n - 3] == b'-'
        && bytes[n - 2].is_ascii_digit()
        && bytes[n - 1].is_ascii_digit()
}

/// Produce the eligible machine set for a scope, sorted by name for a
/// deterministic processing order.
pub async fn eligible_machines(
    ctx: &RunContext,
    scope: &str,
) -> Result<Vec<Machine>, FatalRunError> {
    let all = ctx
        .inventory
        .list_machines(scope)
        .await
        .map_err(FatalRunError::Inventory)?;
    let total = all.len();

    let mut eligible = Vec::new();
    for machine in all {
        if machine.power_state != PowerState::PoweredOn {
            continue;
        }
        if name_excluded(&machine.name) {
            tracing::debug!(machine = %machine.name, "Excluded by name pattern");
            continue;
        }
        // The cached tag set can lag; the no-backup marker is checked against
        // a live lookup per candidate.
        match ctx.inventory.get_tags(&machine.name).await {
            Ok(raw) => {
                if MachineTags::classify(&raw).no_backup {
                    tracing::debug!(machine = %machine.name, "Excluded by no-backup tag");
                    continue;
                }
            }
            Err(e) => {
                // Lookup failure falls back to the cached classification;
                // a cached no-backup marker still excludes the machine.
                if machine.tags.no_backup {
                    tracing::warn!(machine = %machine.name, error = %e, "Live tag lookup failed, cached no-backup marker excludes machine");
                    continue;
                }
                tracing::warn!(machine = %machine.name, error = %e, "Live tag lookup failed, falling back to cached tags");
            }
        }
        eligible.push(machine);
    }

    eligible.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::info!(scope = %scope, total, eligible = eligible.len(), "Inventory filtered");
    Ok(eligible)
}
