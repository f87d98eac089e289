//! In-Memory Backend
//!
//! Records live in an ordered map, so scans come back in ordinal key
//! order for free. Writes are staged and applied only when the mutation
//! succeeds. Nothing survives the process.

use super::{apply, Backend, BackendStats, Mutation, OpCounters, Staged};
use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

/// An ordered, transactional in-memory backend.
///
/// # Example
///
/// ```
/// use kvrealm::backend::{Backend, MemoryBackend, Transaction};
/// use kvrealm::Record;
///
/// let mut backend = MemoryBackend::new();
/// backend
///     .write(Box::new(|tx: &mut dyn Transaction| tx.add(Record::new("name", "Ariz"), true)))
///     .unwrap();
///
/// assert_eq!(backend.find("name").unwrap(), Some(Record::new("name", "Ariz")));
/// assert_eq!(backend.stats().commits, 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Committed records by key
    data: BTreeMap<String, Record>,
    /// Operation counters
    counters: OpCounters,
    /// Set once disposed
    disposed: bool,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with records.
    ///
    /// Later records replace earlier ones with the same key.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let data = records
            .into_iter()
            .map(|record| (record.key.clone(), record))
            .collect();

        Self {
            data,
            ..Self::default()
        }
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

impl Backend for MemoryBackend {
    fn find(&self, key: &str) -> StoreResult<Option<Record>> {
        self.ensure_open()?;
        self.counters.find();
        trace!(key, "memory find");
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
        apply(&mut self.data, pending);
        self.counters.commit();
        debug!(changes, records = self.data.len(), "Transaction committed");

        Ok(())
    }

    fn dispose(&mut self) -> StoreResult<()> {
        if !self.disposed {
            self.disposed = true;
            self.data.clear();
            info!("Memory backend disposed");
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
