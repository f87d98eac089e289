//! Backend Module
//!
//! The store never touches storage directly. It talks to a [`Backend`],
//! which provides point lookups, full scans, and atomic writes. Inside a
//! write, mutations go through a [`Transaction`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │        get / set / remove / keys / purge_expired            │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │ find / scan                   │ write(mutation)
//!                ▼                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Backend                               │
//! │   ┌──────────────────┐        ┌──────────────────────────┐  │
//! │   │ committed records│◄─apply─│ Staged (per transaction) │  │
//! │   └──────────────────┘        └──────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Semantics
//!
//! - A mutation receives a `&mut dyn Transaction` and returns a result.
//! - Staged changes become visible only if the mutation returns `Ok` and
//!   the backend commits successfully. Otherwise nothing is applied.
//! - `add` with `upsert = false` fails on an existing key.
//! - `remove` of a missing key succeeds.
//!
//! ## Backends
//!
//! - [`MemoryBackend`]: ordered in-memory map
//! - [`FileBackend`]: in-memory map persisted to a JSON snapshot on commit

pub mod file;
pub mod memory;
pub mod snapshot;

use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

// Re-export commonly used types
pub use file::FileBackend;
pub use memory::MemoryBackend;

/// A unit of work run inside [`Backend::write`].
pub type Mutation<'a> = Box<dyn FnOnce(&mut dyn Transaction) -> StoreResult<()> + 'a>;

/// Boxes a closure as a [`Mutation`].
///
/// Lets the closure's argument type be inferred at the call site.
pub fn mutation<'a, F>(f: F) -> Mutation<'a>
where
    F: FnOnce(&mut dyn Transaction) -> StoreResult<()> + 'a,
{
    Box::new(f)
}

/// Mutating view of a backend inside a write.
pub trait Transaction {
    /// Looks up a key, seeing changes staged earlier in this transaction.
    fn find(&self, key: &str) -> StoreResult<Option<Record>>;

    /// Stages an insert. With `upsert`, an existing record is replaced in
    /// full; without it, an existing key is a [`StoreError::DuplicateKey`].
    fn add(&mut self, record: Record, upsert: bool) -> StoreResult<()>;

    /// Stages the removal of the record stored under `record.key`.
    fn remove(&mut self, record: &Record) -> StoreResult<()>;
}

/// Storage collaborator used by the store.
///
/// A backend is owned by exactly one store and is driven from a single
/// execution context; it needs no internal locking.
pub trait Backend {
    /// Returns the record stored under `key`, expired or not.
    fn find(&self, key: &str) -> StoreResult<Option<Record>>;

    /// Returns every stored record in ordinal key order.
    fn scan(&self) -> StoreResult<Vec<Record>>;

    /// Runs `mutation` and commits its changes atomically.
    ///
    /// If the mutation or the commit fails, the error is returned and no
    /// change is applied.
    fn write(&mut self, mutation: Mutation<'_>) -> StoreResult<()>;

    /// Releases the backend. Calling it again is a no-op.
    fn dispose(&mut self) -> StoreResult<()>;

    /// Returns true once [`Backend::dispose`] has run.
    fn is_disposed(&self) -> bool;

    /// Returns operation counters.
    fn stats(&self) -> BackendStats;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn find(&self, key: &str) -> StoreResult<Option<Record>> {
        (**self).find(key)
    }

    fn scan(&self) -> StoreResult<Vec<Record>> {
        (**self).scan()
    }

    fn write(&mut self, mutation: Mutation<'_>) -> StoreResult<()> {
        (**self).write(mutation)
    }

    fn dispose(&mut self) -> StoreResult<()> {
        (**self).dispose()
    }

    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }

    fn stats(&self) -> BackendStats {
        (**self).stats()
    }
}

/// Backend operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Number of records currently stored (including expired ones)
    pub records: u64,
    /// Total point lookups
    pub finds: u64,
    /// Total full scans
    pub scans: u64,
    /// Total committed transactions
    pub commits: u64,
    /// Total transactions rolled back
    pub aborts: u64,
}

/// Shared counters behind [`BackendStats`].
#[derive(Debug, Default)]
pub(crate) struct OpCounters {
    finds: AtomicU64,
    scans: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
}

impl OpCounters {
    pub(crate) fn find(&self) {
        self.finds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, records: usize) -> BackendStats {
        BackendStats {
            records: records as u64,
            finds: self.finds.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }
}

/// Changes staged by one transaction: `Some` upserts, `None` deletes.
pub(crate) type Pending = BTreeMap<String, Option<Record>>;

/// Transaction overlay over a committed map.
pub(crate) struct Staged<'a> {
    committed: &'a BTreeMap<String, Record>,
    pending: Pending,
}

impl<'a> Staged<'a> {
    pub(crate) fn new(committed: &'a BTreeMap<String, Record>) -> Self {
        Self {
            committed,
            pending: BTreeMap::new(),
        }
    }

    pub(crate) fn into_pending(self) -> Pending {
        self.pending
    }

    fn contains(&self, key: &str) -> bool {
        match self.pending.get(key) {
            Some(staged) => staged.is_some(),
            None => self.committed.contains_key(key),
        }
    }
}

impl Transaction for Staged<'_> {
    fn find(&self, key: &str) -> StoreResult<Option<Record>> {
        Ok(match self.pending.get(key) {
            Some(staged) => staged.clone(),
            None => self.committed.get(key).cloned(),
        })
    }

    fn add(&mut self, record: Record, upsert: bool) -> StoreResult<()> {
        if !upsert && self.contains(&record.key) {
            return Err(StoreError::DuplicateKey(record.key));
        }
        self.pending.insert(record.key.clone(), Some(record));
        Ok(())
    }

    fn remove(&mut self, record: &Record) -> StoreResult<()> {
        self.pending.insert(record.key.clone(), None);
        Ok(())
    }
}

/// Applies staged changes to a committed map.
pub(crate) fn apply(data: &mut BTreeMap<String, Record>, pending: Pending) {
    for (key, staged) in pending {
        match staged {
            Some(record) => {
                data.insert(key, record);
            }
            None => {
                data.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed() -> BTreeMap<String, Record> {
        let mut data = BTreeMap::new();
        data.insert("a".to_string(), Record::new("a", 1));
        data
    }

    #[test]
    fn test_staged_reads_own_writes() {
        let data = committed();
        let mut tx = Staged::new(&data);

        tx.add(Record::new("b", 2), true).unwrap();
        tx.remove(&Record::new("a", 1)).unwrap();

        assert_eq!(tx.find("b").unwrap(), Some(Record::new("b", 2)));
        assert_eq!(tx.find("a").unwrap(), None);
        // The committed map is untouched until apply
        assert!(data.contains_key("a"));
    }

    #[test]
    fn test_add_without_upsert_rejects_existing_key() {
        let data = committed();
        let mut tx = Staged::new(&data);

        assert!(matches!(
            tx.add(Record::new("a", 2), false),
            Err(StoreError::DuplicateKey(key)) if key == "a"
        ));

        // Once removed in the same transaction the key is free again
        tx.remove(&Record::new("a", 1)).unwrap();
        assert!(tx.add(Record::new("a", 2), false).is_ok());
    }

    #[test]
    fn test_apply() {
        let mut data = committed();
        let mut tx = Staged::new(&data);
        tx.add(Record::new("a", 10), true).unwrap();
        tx.add(Record::new("c", 3), true).unwrap();
        tx.remove(&Record::new("missing", 0)).unwrap();
        let pending = tx.into_pending();

        apply(&mut data, pending);

        assert_eq!(data.len(), 2);
        assert_eq!(data["a"], Record::new("a", 10));
        assert_eq!(data["c"], Record::new("c", 3));
    }
}
