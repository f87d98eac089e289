//! Error Types
//!
//! Every fallible store or backend operation returns a [`StoreResult`].
//! Backend failures travel to the caller unchanged: the store performs no
//! retries and never swallows an error, except while being dropped.
//!
//! A missing key is not an error. Lookups report it as `None`.

use thiserror::Error;

/// Errors produced by the store, its backends, and value conversions.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored value (or an absent record) could not be converted to the
    /// requested type.
    #[error("cannot convert {from} to {to}")]
    TypeConversion {
        /// Kind of the stored value, or `"nothing"` when the key was absent
        from: &'static str,
        /// Name of the requested type
        to: &'static str,
    },

    /// A record was compared against something that is not a record.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A non-upsert add hit a key that already exists.
    #[error("a record with key '{0}' already exists")]
    DuplicateKey(String),

    /// The store or backend has been disposed.
    #[error("store has been disposed")]
    Disposed,

    /// A backend-reported failure, including aborted transactions.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O failure in a persistent backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persistent backend found data it cannot read.
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Shorthand for a conversion failure.
    pub fn conversion(from: &'static str, to: &'static str) -> Self {
        StoreError::TypeConversion { from, to }
    }
}

/// Result type used across the crate.
pub type StoreResult<T> = Result<T, StoreError>;
