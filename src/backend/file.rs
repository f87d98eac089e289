//! File Backend
//!
//! Keeps every record in memory and persists the full set to a JSON
//! snapshot (see [`snapshot`](super::snapshot)) on each commit.
//!
//! ## Commit Protocol
//!
//! 1. Run the mutation against a staged overlay.
//! 2. Build the post-commit map and encode it.
//! 3. Write `<path>.tmp`, optionally fsync, rename it over `<path>`.
//! 4. Publish the new map in memory.
//!
//! A failure at any step leaves both the file and the in-memory map at
//! the previous commit. Rename is atomic on the same filesystem, so a
//! reader of the file sees either the old or the new snapshot.

use super::{apply, snapshot, Backend, BackendStats, Mutation, OpCounters, Staged};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// A transactional backend persisted to a single snapshot file.
#[derive(Debug)]
pub struct FileBackend {
    /// Snapshot location
    path: PathBuf,
    /// fsync before publishing a commit
    sync_on_commit: bool,
    /// Committed records by key
    data: BTreeMap<String, Record>,
    /// Operation counters
    counters: OpCounters,
    /// Set once disposed
    disposed: bool,
}

impl FileBackend {
    /// Opens the snapshot described by `config`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file is missing and `create_if_missing`
    ///   is off, or if it cannot be read or created
    /// - [`StoreError::Corrupt`] if the file is not a valid snapshot
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let path = config.path.clone();

        let data = match fs::read(&path) {
            Ok(bytes) => snapshot::decode(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound && config.create_if_missing => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let empty = BTreeMap::new();
                persist(&path, &empty, config.sync_on_commit)?;
                info!(path = %path.display(), "Created new store file");
                empty
            }
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), records = data.len(), "File backend opened");

        Ok(Self {
            path,
            sync_on_commit: config.sync_on_commit,
            data,
            counters: OpCounters::default(),
            disposed: false,
        })
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.disposed {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// Writes `data` to `<path>.tmp` and renames it over `path`.
fn persist(path: &Path, data: &BTreeMap<String, Record>, sync: bool) -> StoreResult<()> {
    let bytes = snapshot::encode(data.values())?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        if sync {
            file.sync_all()?;
        }
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    trace!(path = %path.display(), bytes = bytes.len(), "Snapshot written");
    Ok(())
}

impl Backend for FileBackend {
    fn find(&self, key: &str) -> StoreResult<Option<Record>> {
        self.ensure_open()?;
        self.counters.find();
        Ok(self.data.get(key).cloned())
    }

    fn scan(&self) -> StoreResult<Vec<Record>> {
        self.ensure_open()?;
        self.counters.scan();
        Ok(self.data.values().cloned().collect())
    }

    fn write(&mut self, mutation: Mutation<'_>) -> StoreResult<()> {
        self.ensure_open()?;

        let mut tx = Staged::new(&self.data);
        if let Err(e) = mutation(&mut tx) {
            self.counters.abort();
            debug!(error = %e, "Transaction rolled back");
            return Err(e);
        }
        let pending = tx.into_pending();
        let changes = pending.len();

        let mut next = self.data.clone();
        apply(&mut next, pending);

        if let Err(e) = persist(&self.path, &next, self.sync_on_commit) {
            self.counters.abort();
            warn!(path = %self.path.display(), error = %e, "Commit failed, snapshot unchanged");
            return Err(e);
        }

        self.data = next;
        self.counters.commit();
        debug!(changes, records = self.data.len(), "Transaction committed");

        Ok(())
    }

    fn dispose(&mut self) -> StoreResult<()> {
        if !self.disposed {
            self.disposed = true;
            self.data.clear();
            info!(path = %self.path.display(), "File backend disposed");
        }
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn stats(&self) -> BackendStats {
        self.counters.snapshot(self.data.len())
    }
}
