//! Snapshot Format
//!
//! Maps [`Record`]s to and from the JSON document the file backend keeps
//! on disk. The record type itself knows nothing about serialization;
//! this module is the only place the on-disk shape is defined.
//!
//! ```text
//! {
//!   "version": 1,
//!   "records": [
//!     { "key": "Pin Code",
//!       "value": { "type": "integer", "value": 1234 },
//!       "expires_on": { "secs": 1767225600, "nanos": 0 } },
//!     { "key": "Username",
//!       "value": { "type": "text", "value": "KewlSmith" },
//!       "expires_on": null }
//!   ]
//! }
//! ```
//!
//! Floats must be finite (JSON has no NaN or infinity) and expirations
//! must not precede the Unix epoch. Violations fail the commit rather
//! than silently writing something that would read back differently.

use crate::error::{StoreError, StoreResult};
use crate::record::{Record, Value};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    records: Vec<StoredRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    key: String,
    value: StoredValue,
    expires_on: Option<StoredTime>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum StoredValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Time since the Unix epoch, kept exact to the nanosecond.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTime {
    secs: u64,
    nanos: u32,
}

impl StoredValue {
    fn from_value(key: &str, value: &Value) -> StoreResult<Self> {
        Ok(match value {
            Value::Null => StoredValue::Null,
            Value::Bool(b) => StoredValue::Bool(*b),
            Value::Integer(i) => StoredValue::Integer(*i),
            Value::Float(f) if f.is_finite() => StoredValue::Float(*f),
            Value::Float(_) => {
                return Err(StoreError::Backend(format!(
                    "cannot persist non-finite float under key '{}'",
                    key
                )))
            }
            Value::Text(s) => StoredValue::Text(s.clone()),
            Value::Bytes(b) => StoredValue::Bytes(b.to_vec()),
        })
    }

    fn into_value(self) -> Value {
        match self {
            StoredValue::Null => Value::Null,
            StoredValue::Bool(b) => Value::Bool(b),
            StoredValue::Integer(i) => Value::Integer(i),
            StoredValue::Float(f) => Value::Float(f),
            StoredValue::Text(s) => Value::Text(s),
            StoredValue::Bytes(b) => Value::Bytes(Bytes::from(b)),
        }
    }
}

impl StoredTime {
    fn from_system_time(key: &str, time: SystemTime) -> StoreResult<Self> {
        let since_epoch = time.duration_since(UNIX_EPOCH).map_err(|_| {
            StoreError::Backend(format!(
                "cannot persist expiration before the Unix epoch under key '{}'",
                key
            ))
        })?;

        Ok(StoredTime {
            secs: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
        })
    }

    fn into_system_time(self) -> StoreResult<SystemTime> {
        if self.nanos >= 1_000_000_000 {
            return Err(StoreError::Corrupt(format!(
                "nanosecond field out of range: {}",
                self.nanos
            )));
        }
        UNIX_EPOCH
            .checked_add(Duration::new(self.secs, self.nanos))
            .ok_or_else(|| StoreError::Corrupt("expiration out of range".to_string()))
    }
}

/// Serializes records into a snapshot document.
pub fn encode<'a>(records: impl IntoIterator<Item = &'a Record>) -> StoreResult<Vec<u8>> {
    let records = records
        .into_iter()
        .map(|record| {
            Ok(StoredRecord {
                key: record.key.clone(),
                value: StoredValue::from_value(&record.key, &record.value)?,
                expires_on: record
                    .expires_on
                    .map(|time| StoredTime::from_system_time(&record.key, time))
                    .transpose()?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    let file = SnapshotFile {
        version: SNAPSHOT_VERSION,
        records,
    };

    serde_json::to_vec_pretty(&file).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Parses a snapshot document into a key-indexed map.
pub fn decode(bytes: &[u8]) -> StoreResult<BTreeMap<String, Record>> {
    let file: SnapshotFile =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    if file.version != SNAPSHOT_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported snapshot version {}",
            file.version
        )));
    }

    let mut data = BTreeMap::new();
    for stored in file.records {
        let record = Record {
            value: stored.value.into_value(),
            expires_on: stored
                .expires_on
                .map(StoredTime::into_system_time)
                .transpose()?,
            key: stored.key,
        };

        if data.contains_key(&record.key) {
            return Err(StoreError::Corrupt(format!(
                "duplicate key '{}' in snapshot",
                record.key
            )));
        }
        data.insert(record.key.clone(), record);
    }

    Ok(data)
}
