//! Retention class resolution.
//!
//! The symbolic retention vocabulary is a closed table; the lookup is a
//! plain data-structure scan so the table stays independently testable and
//! extendable without touching control flow.

/// Resolved retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep restore points for this many cycles/days.
    Days(u32),
    /// Machine declared no-backup: no job is created or maintained.
    ///
    /// Distinct from `Days(9999)` ("never" — keep forever on an active job).
    Disabled,
}

impl Retention {
    pub fn days(&self) -> Option<u32> {
        match self {
            Retention::Days(d) => Some(*d),
            Retention::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub retention: Retention,
    /// True when the tag was absent (or unrecognized) and the fixed default
    /// was applied. The caller persists the default tag and notifies.
    pub defaulted: bool,
}

/// Fallback applied when no retention class resolves.
pub const DEFAULT_RETENTION_DAYS: u32 = 3;
/// Tag value persisted back when the default is applied.
pub const DEFAULT_RETENTION_TAG: &str = "3-days";

const TABLE: &[(&str, Retention)] = &[
    ("6-months", Retention::Days(180)),
    ("3-months", Retention::Days(90)),
    ("2-months", Retention::Days(60)),
    ("1-month", Retention::Days(30)),
    ("next-night", Retention::Days(2)),
    ("3-days", Retention::Days(3)),
    ("never", Retention::Days(9999)),
    ("2-weeks", Retention::Days(14)),
    ("1-week", Retention::Days(7)),
    ("1-year", Retention::Days(365)),
    ("no-backup", Retention::Disabled),
];

/// Resolve a retention tag value. Absent and unrecognized values both fall
/// back to the default and are flagged as defaulted.
pub fn resolve(tag_value: Option<&str>) -> Resolution {
    if let Some(value) = tag_value {
        if let Some((_, retention)) = TABLE.iter().find(|(class, _)| *class == value) {
            return Resolution {
                retention: *retention,
                defaulted: false,
            };
        }
        tracing::debug!(value = %value, "Unrecognized retention class, applying default");
    }
    Resolution {
        retention: Retention::Days(DEFAULT_RETENTION_DAYS),
        defaulted: true,
    }
}
