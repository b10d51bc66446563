//! Configuration for the JSONL file store.

use std::path::PathBuf;

/// Configuration for the file store.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding one journal per target (default: platform data
    /// dir under `mnemosyne/audit`).
    pub dir: PathBuf,

    /// Maximum size of an active journal before rotation (bytes).
    pub max_file_bytes: u64,

    /// Maximum number of rotated journals kept per target.
    pub max_rotated_files: usize,

    /// Retention period in days for rotated journals. Zero disables
    /// age-based pruning (count-based pruning still applies).
    pub retention_days: u32,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            max_file_bytes: 10 * 1024 * 1024, // 10 MB
            max_rotated_files: 5,
            retention_days: 90,
        }
    }
}

impl FileStoreConfig {
    /// Creates a configuration rooted at the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Sets the rotation threshold in bytes.
    #[must_use]
    pub const fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Sets how many rotated journals are kept per target.
    #[must_use]
    pub const fn with_max_rotated_files(mut self, count: usize) -> Self {
        self.max_rotated_files = count;
        self
    }

    /// Sets the retention period for rotated journals.
    #[must_use]
    pub const fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}

/// Default journal directory.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mnemosyne")
        .join("audit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FileStoreConfig::default();
        assert_eq!(config.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_rotated_files, 5);
        assert_eq!(config.retention_days, 90);
    }

    #[test]
    fn test_config_builders() {
        let config = FileStoreConfig::new("/tmp/audit")
            .with_max_file_bytes(1024)
            .with_max_rotated_files(2)
            .with_retention_days(0);

        assert_eq!(config.dir, PathBuf::from("/tmp/audit"));
        assert_eq!(config.max_file_bytes, 1024);
        assert_eq!(config.max_rotated_files, 2);
        assert_eq!(config.retention_days, 0);
    }
}
