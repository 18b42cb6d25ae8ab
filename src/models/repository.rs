use serde::{Deserialize, Serialize};

/// Concurrent task cap applied to every repository this engine provisions.
pub const REPOSITORY_TASK_LIMIT: u32 = 6;

/// Product subdirectory appended to every repository folder path.
pub const PRODUCT_SUBPATH: &str = "vbk";

/// Folder variant under the location key, selected by the alternate-location tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderVariant {
    Primary,
    Alternate,
}

impl FolderVariant {
    pub fn folder_name(&self) -> &'static str {
        match self {
            FolderVariant::Primary => "backups",
            FolderVariant::Alternate => "backups2",
        }
    }
}

/// A named storage target in the backup management service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub folder_path: String,
    pub task_limit: u32,
}

/// Build the backing folder path for a repository on `location_key`.
pub fn repository_folder_path(location_key: &str, variant: FolderVariant) -> String {
    format!("{}/{}/{}", location_key, variant.folder_name(), PRODUCT_SUBPATH)
}
