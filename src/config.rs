//! Store Configuration
//!
//! Settings for opening a file-backed store. The store never reaches for
//! an ambient default database: callers pass a backend or a
//! [`StoreConfig`] explicitly.

use std::path::{Path, PathBuf};

/// Default snapshot file name used when no path is given.
pub const DEFAULT_DB_PATH: &str = "kvrealm.json";

/// Configuration for [`FileBackend`](crate::backend::FileBackend).
///
/// # Example
///
/// ```
/// use kvrealm::StoreConfig;
///
/// let config = StoreConfig::new("/tmp/settings.json")
///     .create_if_missing(false)
///     .sync_on_commit(false);
/// assert!(!config.create_if_missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the snapshot file
    pub path: PathBuf,
    /// Create the file (and parent directories) if it does not exist
    pub create_if_missing: bool,
    /// fsync the snapshot before publishing each commit
    pub sync_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            create_if_missing: true,
            sync_on_commit: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given path with default options.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Sets whether a missing file is created.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets whether each commit is synced to disk.
    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(config.create_if_missing);
        assert!(config.sync_on_commit);
    }

    #[test]
    fn test_builder_setters() {
        let config = StoreConfig::new("data/kv.json").sync_on_commit(false);
        assert_eq!(config.path, PathBuf::from("data/kv.json"));
        assert!(config.create_if_missing);
        assert!(!config.sync_on_commit);
    }
}
