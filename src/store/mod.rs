//! Store Module
//!
//! The key-value façade over a [`Backend`](crate::backend::Backend): get,
//! typed get, set (with optional expiration), remove, listing, purge, and
//! dispose. Expiration is lazy: it is checked against a [`Clock`] when a
//! key is read.
//!
//! ## Example
//!
//! ```
//! use kvrealm::{ManualClock, MemoryBackend, Store};
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! let clock = ManualClock::new(UNIX_EPOCH);
//! let mut store = Store::with_clock(MemoryBackend::new(), clock.clone());
//!
//! store.set_with_ttl("session", "token123", Duration::from_secs(60)).unwrap();
//! assert!(store.get("session").unwrap().is_some());
//!
//! clock.advance(Duration::from_secs(60));
//! assert!(store.get("session").unwrap().is_none());
//! ```

pub mod clock;
mod pattern;
pub mod realm;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use realm::{Store, TtlStatus};
