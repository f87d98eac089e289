//! # kvrealm - An Expiring Key-Value Record Store
//!
//! kvrealm is a small key-value layer over a transactional record backend.
//! Each key maps to a [`Record`] holding a typed [`Value`] and an optional
//! expiration instant. Expired records disappear lazily, the next time
//! they are read.
//!
//! ## Features
//!
//! - **Typed Values**: null, bool, integer, float, text, and bytes, with
//!   lenient typed reads via [`Store::get_as`]
//! - **Upsert Writes**: one record per key, replaced in full on `set`
//! - **Atomic Mutations**: every `set`/`remove` is exactly one backend
//!   transaction; failed transactions leave no trace
//! - **Lazy Expiry**: checked on read against a pluggable [`Clock`]
//! - **Pluggable Backends**: in-memory, or a JSON snapshot file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                               kvrealm                               │
//! │                                                                     │
//! │  ┌──────────────┐     ┌──────────────────────────────────────────┐  │
//! │  │    Clock     │────>│                 Store                    │  │
//! │  │ System/Manual│     │  get / get_as / set / remove / dispose   │  │
//! │  └──────────────┘     └────────────────────┬─────────────────────┘  │
//! │                                            │ find / scan / write    │
//! │                                            ▼                        │
//! │                       ┌──────────────────────────────────────────┐  │
//! │                       │            Backend (trait)               │  │
//! │                       │  ┌───────────────┐  ┌─────────────────┐  │  │
//! │                       │  │ MemoryBackend │  │  FileBackend    │  │  │
//! │                       │  │   BTreeMap    │  │ JSON snapshot   │  │  │
//! │                       │  └───────────────┘  └─────────────────┘  │  │
//! │                       └──────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use kvrealm::{Store, StoreConfig};
//! use std::time::Duration;
//!
//! # let dir = tempfile::TempDir::new().unwrap();
//! # let path = dir.path().join("settings.json");
//! let mut store = Store::open(&StoreConfig::new(&path)).unwrap();
//!
//! store.set("Username", "KewlSmith").unwrap();
//! store.set("Pin Code", 1234).unwrap();
//! store.set_with_ttl("Session", "abc123", Duration::from_secs(3600)).unwrap();
//!
//! assert_eq!(store.get_as::<i64>("Pin Code").unwrap(), 1234);
//! assert_eq!(store.keys("*").unwrap(), vec!["Pin Code", "Session", "Username"]);
//! ```
//!
//! ## Module Overview
//!
//! - [`record`]: records, values, typed conversion, equality policies
//! - [`backend`]: backend and transaction traits, memory and file backends
//! - [`store`]: the store façade and clocks
//! - [`config`]: configuration for file-backed stores
//! - [`error`]: the error type
//!
//! ## Threading
//!
//! A store is driven from one execution context at a time: every
//! operation takes `&mut self`. Open one store per thread when work runs
//! in parallel.

pub mod backend;
pub mod config;
pub mod error;
pub mod record;
pub mod store;

// Re-export commonly used types for convenience
pub use backend::{Backend, BackendStats, FileBackend, MemoryBackend, Transaction};
pub use config::{StoreConfig, DEFAULT_DB_PATH};
pub use error::{StoreError, StoreResult};
pub use record::{FromValue, KeyEquality, KeyValueEquality, Record, Value};
pub use store::{Clock, ManualClock, Store, SystemClock, TtlStatus};

/// Version of kvrealm
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
