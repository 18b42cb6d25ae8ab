use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag category wire names used by the inventory platform.
pub const TAG_BACKUP_PATH: &str = "backup_path";
pub const TAG_ALTERNATE_LOCATION: &str = "backup_location_alt";
pub const TAG_RETENTION: &str = "backup_retention";
pub const TAG_NO_BACKUP: &str = "no_backup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestOs {
    Windows,
    Linux,
    Other,
}

impl GuestOs {
    pub fn is_windows(&self) -> bool {
        matches!(self, GuestOs::Windows)
    }
}

/// A virtual machine as reported by the inventory platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub guest_os: GuestOs,
    pub guest_hostname: Option<String>,
    pub power_state: PowerState,
    #[serde(default)]
    pub tags: MachineTags,
}

/// Typed view of a machine's backup policy tags.
///
/// The raw tag map is classified exactly once, at the inventory boundary;
/// downstream code never does its own string matching on tag values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineTags {
    /// Explicit backup-path tag: the repository location key.
    pub backup_path: Option<String>,
    /// Alternate-location marker: use the secondary backup folder.
    pub alternate_location: bool,
    /// Symbolic retention class, resolved by the retention table.
    pub retention: Option<String>,
    /// No-backup marker: machine opted out of backup entirely.
    pub no_backup: bool,
}

impl MachineTags {
    /// Classify a raw category -> value tag map into typed policy fields.
    ///
    /// The no-backup marker matches on either the dedicated category or any
    /// tag value containing "nobackup" (case-insensitive) — the platform has
    /// historically carried both spellings.
    pub fn classify(raw: &HashMap<String, String>) -> Self {
        let mut tags = MachineTags::default();
        for (category, value) in raw {
            match category.as_str() {
                TAG_BACKUP_PATH => tags.backup_path = Some(value.clone()),
                TAG_ALTERNATE_LOCATION => tags.alternate_location = true,
                TAG_RETENTION => tags.retention = Some(value.clone()),
                TAG_NO_BACKUP => tags.no_backup = true,
                _ => {
                    if value.to_lowercase().contains("nobackup") {
                        tags.no_backup = true;
                    }
                }
            }
        }
        tags
    }
}

/// One node in a machine's location ancestor chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationNode {
    pub name: String,
    /// Name of the parent node; `None` for the hierarchy root.
    pub parent: Option<String>,
}
