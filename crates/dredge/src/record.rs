//! Output unit of a scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Row keys handed to the host framework.
pub mod keys {
    pub const FILE_DIR: &str = "fileDir";
    pub const FILE: &str = "file";
    pub const FILE_ABSOLUTE_PATH: &str = "fileAbsolutePath";
    pub const FILE_SIZE: &str = "fileSize";
    pub const FILE_LAST_MODIFIED: &str = "fileLastModified";
}

/// One matching file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute containing directory
    pub file_dir: PathBuf,
    /// File name only
    pub file: String,
    pub file_absolute_path: PathBuf,
    pub file_size: u64,
    pub file_last_modified: DateTime<Utc>,
}

impl FileRecord {
    /// The record as a host row keyed by [`keys`].
    pub fn to_row(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut row = serde_json::Map::new();
        row.insert(
            keys::FILE_DIR.to_string(),
            self.file_dir.to_string_lossy().into_owned().into(),
        );
        row.insert(keys::FILE.to_string(), self.file.clone().into());
        row.insert(
            keys::FILE_ABSOLUTE_PATH.to_string(),
            self.file_absolute_path.to_string_lossy().into_owned().into(),
        );
        row.insert(keys::FILE_SIZE.to_string(), self.file_size.into());
        row.insert(
            keys::FILE_LAST_MODIFIED.to_string(),
            self.file_last_modified.to_rfc3339().into(),
        );
        row
    }
}
