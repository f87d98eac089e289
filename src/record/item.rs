//! The Record Type
//!
//! A [`Record`] is the unit of storage: a key, a [`Value`], and an optional
//! expiration instant. Records are plain values. The store builds one per
//! `set` and backends hand back owned copies on lookup, so nothing outside
//! the backend holds a live reference into storage.
//!
//! ## Ordering vs. Equality
//!
//! Equality covers all three fields. Ordering only looks at the key
//! (ordinal, byte-wise). Because the two disagree, `Record` does not
//! implement `Ord`; sort with [`Record::cmp_by_key`] instead.

use super::value::Value;
use crate::error::{StoreError, StoreResult};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, SystemTime};

/// A key, its value, and an optional expiration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Primary key, unique within a store
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// When this record stops being visible (None = never expires)
    pub expires_on: Option<SystemTime>,
}

impl Record {
    /// Creates a record that never expires.
    ///
    /// # Example
    ///
    /// ```
    /// use kvrealm::{Record, Value};
    ///
    /// let record = Record::new("Username", "KewlSmith");
    /// assert_eq!(record.key, "Username");
    /// assert_eq!(record.value, Value::from("KewlSmith"));
    /// assert!(record.expires_on.is_none());
    /// ```
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_on: None,
        }
    }

    /// Creates a record that expires at the given instant.
    pub fn with_expiration(
        key: impl Into<String>,
        value: impl Into<Value>,
        expires_on: SystemTime,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_on: Some(expires_on),
        }
    }

    /// Creates a record that expires `ttl` after `now`.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidArgument`] if `now + ttl` is not a
    /// representable time.
    pub fn expiring_in(
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Duration,
        now: SystemTime,
    ) -> StoreResult<Self> {
        let expires_on = now.checked_add(ttl).ok_or_else(|| {
            StoreError::InvalidArgument(format!("ttl of {}s is out of range", ttl.as_secs()))
        })?;
        Ok(Self::with_expiration(key, value, expires_on))
    }

    /// Compares two records by key.
    ///
    /// An absent `other` compares as `Greater`, so absent entries sort first.
    pub fn compare(&self, other: Option<&Record>) -> Ordering {
        match other {
            None => Ordering::Greater,
            Some(other) if std::ptr::eq(self, other) => Ordering::Equal,
            Some(other) => self.cmp_by_key(other),
        }
    }

    /// Compares against an arbitrary value.
    ///
    /// Fails with [`StoreError::InvalidArgument`] unless `other` is a
    /// `Record` or absent.
    pub fn compare_dyn(&self, other: Option<&dyn Any>) -> StoreResult<Ordering> {
        match other {
            None => Ok(Ordering::Greater),
            Some(any) => any
                .downcast_ref::<Record>()
                .map(|record| self.compare(Some(record)))
                .ok_or_else(|| {
                    StoreError::InvalidArgument("object must be of type Record".to_string())
                }),
        }
    }

    /// Ordinal key comparison, for use with `sort_by`.
    #[inline]
    pub fn cmp_by_key(&self, other: &Record) -> Ordering {
        self.key.as_bytes().cmp(other.key.as_bytes())
    }

    /// Checks if this record has expired as of `now`.
    ///
    /// A record expires the moment `now` reaches `expires_on`.
    #[inline]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_on.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Remaining lifetime as of `now`, or None if the record never expires.
    ///
    /// Returns `Duration::ZERO` once the record has expired.
    pub fn time_to_live(&self, now: SystemTime) -> Option<Duration> {
        self.expires_on
            .map(|exp| exp.duration_since(now).unwrap_or(Duration::ZERO))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Sorts records into ordinal key order.
pub fn sort_by_key(records: &mut [Record]) {
    records.sort_by(Record::cmp_by_key);
}
