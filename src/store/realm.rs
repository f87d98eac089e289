//! The Store Façade
//!
//! [`Store`] turns a [`Backend`] into a key-value API with optional
//! expiration and typed reads.
//!
//! ## Design Decisions
//!
//! 1. **Explicit Backend**: a store is always built from a backend (or a
//!    [`StoreConfig`]); there is no global default instance.
//! 2. **Lazy Expiry**: expiration is checked only when a key is read. An
//!    expired record found on read is deleted in its own transaction.
//! 3. **One Transaction per Mutation**: every `set`/`remove` is exactly
//!    one `Backend::write`.
//! 4. **Single Owner**: every operation takes `&mut self`, reads included,
//!    because a read may delete. One handle serves one execution context.
//!
//! ## Lifecycle
//!
//! ```text
//!   new / open                dispose
//! ─────────────▶  Open  ─────────────▶  Disposed ──┐
//!                                          ▲        │ dispose (no-op)
//!                                          └────────┘
//! ```

use super::clock::{Clock, SystemClock};
use super::pattern::GlobPattern;
use crate::backend::{mutation, Backend, FileBackend, MemoryBackend, Transaction};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::record::{FromValue, Record, Value};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, trace, warn};

/// Expiration state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key does not exist or has already expired.
    Missing,
    /// Key exists and never expires.
    NoExpiry,
    /// Key expires after the given duration.
    ExpiresIn(Duration),
}

/// A key-value store with lazy expiration over a backend `B`.
///
/// # Example
///
/// ```
/// use kvrealm::Store;
///
/// let mut store = Store::in_memory();
///
/// store.set("Username", "KewlSmith").unwrap();
/// store.set("Pin Code", 1234).unwrap();
///
/// let user = store.get("Username").unwrap().unwrap();
/// assert_eq!(user.value.as_str(), Some("KewlSmith"));
/// assert_eq!(store.get_as::<i64>("Pin Code").unwrap(), 1234);
///
/// store.remove("Username").unwrap();
/// assert!(store.get("Username").unwrap().is_none());
/// ```
pub struct Store<B: Backend, C: Clock = SystemClock> {
    /// The backend, or None once disposed
    backend: Option<B>,
    /// Source of "now" for expiration checks
    clock: C,
}

impl Store<MemoryBackend> {
    /// Creates a store over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl Store<FileBackend> {
    /// Opens a file-backed store.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot file cannot be opened, created, or parsed.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self::new(FileBackend::open(config)?))
    }
}

impl<B: Backend> Store<B> {
    /// Creates a store over `backend` using the system clock.
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<B: Backend, C: Clock> Store<B, C> {
    /// Creates a store over `backend` with a custom clock.
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self {
            backend: Some(backend),
            clock,
        }
    }

    /// Returns the backend, or None once disposed.
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Returns the clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns true once [`Store::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.backend.is_none()
    }

    fn open_backend(&self) -> StoreResult<&B> {
        self.backend.as_ref().ok_or(StoreError::Disposed)
    }

    /// Runs `f` as one backend transaction.
    fn transact<'a, F>(&mut self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut dyn Transaction) -> StoreResult<()> + 'a,
    {
        self.backend
            .as_mut()
            .ok_or(StoreError::Disposed)?
            .write(mutation(f))
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Returns the record stored under `key`.
    ///
    /// Returns `None` if the key was never written, was removed, or has
    /// expired. An expired record is deleted before returning.
    pub fn get(&mut self, key: &str) -> StoreResult<Option<Record>> {
        let found = self.open_backend()?.find(key)?;

        match found {
            Some(record) if record.is_expired_at(self.clock.now()) => {
                debug!(key, "Removing expired record on read");
                self.remove_record(&record)?;
                Ok(None)
            }
            found => {
                trace!(key, hit = found.is_some(), "get");
                Ok(found)
            }
        }
    }

    /// Returns the value under `key` converted to `T`.
    ///
    /// # Errors
    ///
    /// [`StoreError::TypeConversion`] if the key is absent (or expired) or
    /// the stored value does not convert to `T`.
    pub fn get_as<T: FromValue>(&mut self, key: &str) -> StoreResult<T> {
        match self.get(key)? {
            Some(record) => T::from_value(&record.value),
            None => Err(StoreError::conversion("nothing", T::TYPE_NAME)),
        }
    }

    /// Returns true if a live record exists under `key`.
    pub fn contains(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns the expiration state of `key`.
    pub fn time_to_live(&mut self, key: &str) -> StoreResult<TtlStatus> {
        let now = self.clock.now();
        Ok(match self.get(key)? {
            None => TtlStatus::Missing,
            Some(record) => match record.time_to_live(now) {
                None => TtlStatus::NoExpiry,
                Some(remaining) => TtlStatus::ExpiresIn(remaining),
            },
        })
    }

    /// Returns the live keys matching a glob pattern, in ordinal order.
    ///
    /// Expired records are skipped but not deleted; see
    /// [`Store::purge_expired`].
    pub fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let now = self.clock.now();
        let pattern = GlobPattern::new(pattern);

        let mut keys: Vec<String> = self
            .open_backend()?
            .scan()?
            .into_iter()
            .filter(|record| !record.is_expired_at(now) && pattern.matches(&record.key))
            .map(|record| record.key)
            .collect();
        keys.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

        Ok(keys)
    }

    /// Returns the number of live records.
    pub fn len(&self) -> StoreResult<usize> {
        let now = self.clock.now();
        Ok(self
            .open_backend()?
            .scan()?
            .iter()
            .filter(|record| !record.is_expired_at(now))
            .count())
    }

    /// Returns true if there are no live records.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Stores `record`, replacing any record with the same key in full.
    pub fn set_record(&mut self, record: Record) -> StoreResult<()> {
        trace!(key = %record.key, kind = record.value.kind(), "set");
        self.transact(move |tx| tx.add(record, true))
    }

    /// Stores a value that never expires.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<()> {
        self.set_record(Record::new(key, value))
    }

    /// Stores a value that expires at `expires_on`.
    pub fn set_with_expiration(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        expires_on: SystemTime,
    ) -> StoreResult<()> {
        self.set_record(Record::with_expiration(key, value, expires_on))
    }

    /// Stores a value that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidArgument`] if the expiration would overflow
    /// the clock's range. Nothing is written in that case.
    pub fn set_with_ttl(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> StoreResult<()> {
        let now = self.clock.now();
        self.set_record(Record::expiring_in(key, value, ttl, now)?)
    }

    /// Deletes `record` (by key). Deleting a missing record is a no-op.
    pub fn remove_record(&mut self, record: &Record) -> StoreResult<()> {
        trace!(key = %record.key, "remove");
        self.transact(|tx| tx.remove(record))
    }

    /// Deletes the live record under `key`.
    ///
    /// Returns true if a live record was removed. A missing key is a
    /// no-op; an expired one is cleaned up by the read and reported as
    /// missing.
    pub fn remove(&mut self, key: &str) -> StoreResult<bool> {
        match self.get(key)? {
            Some(record) => {
                self.remove_record(&record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes every expired record in a single transaction.
    ///
    /// Returns the number of records removed. Does nothing (and opens no
    /// transaction) when nothing has expired.
    pub fn purge_expired(&mut self) -> StoreResult<usize> {
        let now = self.clock.now();
        let expired: Vec<Record> = self
            .open_backend()?
            .scan()?
            .into_iter()
            .filter(|record| record.is_expired_at(now))
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let count = expired.len();
        self.transact(move |tx| expired.iter().try_for_each(|record| tx.remove(record)))?;
        debug!(expired = count, "Purged expired records");

        Ok(count)
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Releases the backend.
    ///
    /// Safe to call repeatedly. Afterwards every other operation fails with
    /// [`StoreError::Disposed`].
    pub fn dispose(&mut self) -> StoreResult<()> {
        if let Some(mut backend) = self.backend.take() {
            backend.dispose()?;
            info!("Store disposed");
        }
        Ok(())
    }
}

impl<B: Backend, C: Clock> Drop for Store<B, C> {
    fn drop(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.dispose() {
                warn!(error = %e, "Failed to dispose backend on drop");
            }
        }
    }
}

impl<B: Backend, C: Clock> std::fmt::Debug for Store<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("disposed", &self.is_disposed())
            .field("stats", &self.backend.as_ref().map(|b| b.stats()))
            .finish()
    }
}
