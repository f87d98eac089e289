//! Equality Policies
//!
//! `Record`'s own `Eq` compares every field. Callers that want to index
//! or deduplicate by key alone, or by content while ignoring expiration,
//! pick one of the policies here instead:
//!
//! - [`KeyEquality`]: same key
//! - [`KeyValueEquality`]: same key and same value
//!
//! [`Equivalent`] adapts a record to a policy so it can be used as a
//! `HashSet`/`HashMap` key.
//!
//! ## Example
//!
//! ```
//! use kvrealm::record::{dedup_by_policy, KeyEquality, KeyValueEquality};
//! use kvrealm::Record;
//!
//! let records = vec![
//!     Record::new("Username", "KewlSmith"),
//!     Record::new("Username", "Smith"),
//! ];
//!
//! assert_eq!(dedup_by_policy::<KeyValueEquality>(records.clone()).len(), 2);
//! assert_eq!(dedup_by_policy::<KeyEquality>(records).len(), 1);
//! ```

use super::item::Record;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// An equality relation over records with a matching hash.
///
/// Implementations must hash equivalent records identically.
pub trait RecordEquivalence {
    /// Returns true if `a` and `b` are equal under this policy.
    fn equivalent(a: &Record, b: &Record) -> bool;

    /// Feeds the fields this policy compares into `state`.
    fn hash_record<H: Hasher>(record: &Record, state: &mut H);
}

/// Records are equal when their keys are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyEquality;

impl RecordEquivalence for KeyEquality {
    fn equivalent(a: &Record, b: &Record) -> bool {
        a.key == b.key
    }

    fn hash_record<H: Hasher>(record: &Record, state: &mut H) {
        record.key.hash(state);
    }
}

/// Records are equal when their keys and values are equal.
///
/// Expiration is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueEquality;

impl RecordEquivalence for KeyValueEquality {
    fn equivalent(a: &Record, b: &Record) -> bool {
        a.key == b.key && a.value == b.value
    }

    fn hash_record<H: Hasher>(record: &Record, state: &mut H) {
        record.key.hash(state);
        record.value.hash(state);
    }
}

/// A borrowed record compared and hashed under policy `P`.
#[derive(Debug)]
pub struct Equivalent<'a, P> {
    record: &'a Record,
    _policy: PhantomData<P>,
}

impl<'a, P> Equivalent<'a, P> {
    /// Wraps a record.
    pub fn new(record: &'a Record) -> Self {
        Self {
            record,
            _policy: PhantomData,
        }
    }

    /// Returns the wrapped record.
    pub fn record(&self) -> &'a Record {
        self.record
    }
}

impl<P: RecordEquivalence> PartialEq for Equivalent<'_, P> {
    fn eq(&self, other: &Self) -> bool {
        P::equivalent(self.record, other.record)
    }
}

impl<P: RecordEquivalence> Eq for Equivalent<'_, P> {}

impl<P: RecordEquivalence> Hash for Equivalent<'_, P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        P::hash_record(self.record, state);
    }
}

/// Removes records equivalent under `P` to an earlier one.
///
/// The first occurrence wins and the relative order is kept.
pub fn dedup_by_policy<P: RecordEquivalence>(records: Vec<Record>) -> Vec<Record> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(records.len());
        records
            .iter()
            .map(|record| seen.insert(Equivalent::<P>::new(record)))
            .collect()
    };

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::time::{Duration, SystemTime};

    fn policy_hash<P: RecordEquivalence>(record: &Record) -> u64 {
        let mut hasher = DefaultHasher::new();
        Equivalent::<P>::new(record).hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_same_key_different_value() {
        let a = Record::new("Username", "KewlSmith");
        let b = Record::new("Username", "Smith");

        assert!(KeyEquality::equivalent(&a, &b));
        assert!(!KeyValueEquality::equivalent(&a, &b));
        assert_eq!(policy_hash::<KeyEquality>(&a), policy_hash::<KeyEquality>(&b));
    }

    #[test]
    fn test_key_value_ignores_expiration() {
        let a = Record::new("Pin Code", 1234);
        let b = Record::with_expiration(
            "Pin Code",
            1234,
            SystemTime::UNIX_EPOCH + Duration::from_secs(5),
        );

        assert_ne!(a, b);
        assert!(KeyValueEquality::equivalent(&a, &b));
        assert_eq!(
            policy_hash::<KeyValueEquality>(&a),
            policy_hash::<KeyValueEquality>(&b)
        );
    }

    #[test]
    fn test_different_keys_never_equivalent() {
        let a = Record::new("First Name", "John");
        let b = Record::new("Last Name", "John");

        assert!(!KeyEquality::equivalent(&a, &b));
        assert!(!KeyValueEquality::equivalent(&a, &b));
    }

    #[test]
    fn test_hash_set_indexing_by_key() {
        let records = [
            Record::new("a", 1),
            Record::new("b", 2),
            Record::new("a", 3),
        ];

        let index: HashSet<Equivalent<'_, KeyEquality>> =
            records.iter().map(Equivalent::new).collect();

        assert_eq!(index.len(), 2);
        assert!(index.contains(&Equivalent::new(&Record::new("b", "ignored"))));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_in_order() {
        let records = vec![
            Record::new("b", 1),
            Record::new("a", 1),
            Record::new("b", 2),
            Record::new("a", 1),
        ];

        let by_key = dedup_by_policy::<KeyEquality>(records.clone());
        assert_eq!(by_key, vec![Record::new("b", 1), Record::new("a", 1)]);

        let by_content = dedup_by_policy::<KeyValueEquality>(records);
        assert_eq!(
            by_content,
            vec![Record::new("b", 1), Record::new("a", 1), Record::new("b", 2)]
        );
    }
}
