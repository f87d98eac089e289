//! Record Module
//!
//! The data model of the store: [`Record`] (key, value, optional
//! expiration), the [`Value`] tagged union it carries, typed conversion
//! through [`FromValue`], and the key-only / key+value equality policies.
//!
//! ## Example
//!
//! ```
//! use kvrealm::record::{sort_by_key, Record};
//!
//! let mut records = vec![
//!     Record::new("Username", "KewlSmith"),
//!     Record::new("First Name", "John"),
//! ];
//! sort_by_key(&mut records);
//! assert_eq!(records[0].key, "First Name");
//! ```

pub mod equality;
pub mod item;
pub mod value;

// Re-export commonly used types
pub use equality::{dedup_by_policy, Equivalent, KeyEquality, KeyValueEquality, RecordEquivalence};
pub use item::{sort_by_key, Record};
pub use value::{FromValue, Value};
