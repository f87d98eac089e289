//! Record Values
//!
//! A record's payload is a small tagged union rather than an untyped
//! object. The supported kinds are:
//!
//! | Kind      | Rust payload   |
//! |-----------|----------------|
//! | `null`    | -              |
//! | `bool`    | `bool`         |
//! | `integer` | `i64`          |
//! | `float`   | `f64`          |
//! | `text`    | `String`       |
//! | `bytes`   | `bytes::Bytes` |
//!
//! Typed retrieval goes through [`FromValue`], which performs the
//! lenient scalar conversions callers expect (`"42"` reads back as `42`,
//! `1` reads back as `true`, and so on). Range is always checked:
//!
//! - floats read as integers round half-to-even (`2.5` reads as `2`) and
//!   must land inside the target type
//! - integers read as `f64` must be exactly representable, so
//!   `2^53 + 1` fails instead of reading back as `2^53`
//!
//! Anything that does not fit fails with [`StoreError::TypeConversion`].

use crate::error::{StoreError, StoreResult};
use bytes::Bytes;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Bit pattern every NaN is folded into for equality and hashing.
const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

/// The payload stored under a key.
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicitly empty value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Opaque binary data
    Bytes(Bytes),
}

/// Returns the bits used to compare and hash a float.
///
/// `-0.0` equals `0.0` and all NaNs are equal to each other, which keeps
/// `Eq` and `Hash` consistent.
#[inline]
fn canonical_bits(f: f64) -> u64 {
    if f.is_nan() {
        CANONICAL_NAN
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl Value {
    /// Returns the name of this value's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value to `T`.
    ///
    /// # Example
    ///
    /// ```
    /// use kvrealm::Value;
    ///
    /// let pin = Value::from("1234");
    /// assert_eq!(pin.to::<i64>().unwrap(), 1234);
    /// assert!(Value::from("abc").to::<i64>().is_err());
    /// ```
    pub fn to<T: FromValue>(&self) -> StoreResult<T> {
        T::from_value(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => canonical_bits(*f).hash(state),
            Value::Text(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Integer(i64::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(b))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Conversion from a stored [`Value`] into a concrete type.
pub trait FromValue: Sized {
    /// Name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Converts the value, or fails with [`StoreError::TypeConversion`].
    fn from_value(value: &Value) -> StoreResult<Self>;
}

/// Integer view of a value shared by all integer targets.
fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Float(f) if f.is_finite() => {
            let rounded = f.round_ties_even();
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                Some(rounded as i64)
            } else {
                None
            }
        }
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_value(value: &Value) -> StoreResult<Self> {
        integer_of(value).ok_or_else(|| StoreError::conversion(value.kind(), Self::TYPE_NAME))
    }
}

macro_rules! narrow_integer {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn from_value(value: &Value) -> StoreResult<Self> {
                    integer_of(value)
                        .and_then(|i| <$t>::try_from(i).ok())
                        .ok_or_else(|| StoreError::conversion(value.kind(), Self::TYPE_NAME))
                }
            }
        )*
    };
}

narrow_integer!(i32, u32);

impl FromValue for u64 {
    const TYPE_NAME: &'static str = "u64";

    fn from_value(value: &Value) -> StoreResult<Self> {
        let converted = match value {
            Value::Text(s) => s.trim().parse().ok(),
            Value::Float(f) if f.is_finite() => {
                let rounded = f.round_ties_even();
                // u64::MAX as f64 rounds up to 2^64
                if rounded >= 0.0 && rounded < u64::MAX as f64 {
                    Some(rounded as u64)
                } else {
                    None
                }
            }
            other => integer_of(other).and_then(|i| u64::try_from(i).ok()),
        };
        converted.ok_or_else(|| StoreError::conversion(value.kind(), Self::TYPE_NAME))
    }
}

/// `i` as an `f64`, or None if the float would not read back as `i`.
fn exact_float(i: i64) -> Option<f64> {
    let f = i as f64;
    (f as i128 == i128::from(i)).then_some(f)
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> StoreResult<Self> {
        let converted = match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => exact_float(*i),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        };
        converted.ok_or_else(|| StoreError::conversion(value.kind(), Self::TYPE_NAME))
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> StoreResult<Self> {
        let converted = match value {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        };
        converted.ok_or_else(|| StoreError::conversion(value.kind(), Self::TYPE_NAME))
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: &Value) -> StoreResult<Self> {
        match value {
            Value::Null => Err(StoreError::conversion(value.kind(), Self::TYPE_NAME)),
            Value::Bytes(b) => String::from_utf8(b.to_vec())
                .map_err(|_| StoreError::conversion(value.kind(), Self::TYPE_NAME)),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Bytes {
    const TYPE_NAME: &'static str = "Bytes";

    fn from_value(value: &Value) -> StoreResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(Bytes::from(s.clone().into_bytes())),
            other => Err(StoreError::conversion(other.kind(), Self::TYPE_NAME)),
        }
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "Value";

    fn from_value(value: &Value) -> StoreResult<Self> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(1234), Value::Integer(1234));
        assert_eq!(Value::from(7u8), Value::Integer(7));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("Smith"), Value::Text("Smith".into()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(Bytes::from_static(&[1, 2])));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn test_kinds_do_not_mix() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Integer(1), Value::Bool(true));
        assert_ne!(Value::Text("1".into()), Value::Integer(1));
    }

    #[test]
    fn test_float_equality_is_total() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(hash_of(&Value::Float(0.0)), hash_of(&Value::Float(-0.0)));
        assert_eq!(
            hash_of(&Value::Float(f64::NAN)),
            hash_of(&Value::Float(-f64::NAN))
        );
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(Value::Integer(1234).to::<i64>().unwrap(), 1234);
        assert_eq!(Value::from(" 42 ").to::<i64>().unwrap(), 42);
        assert_eq!(Value::Bool(true).to::<i64>().unwrap(), 1);
        assert_eq!(Value::Float(2.5).to::<i64>().unwrap(), 2);
        assert_eq!(Value::Float(3.5).to::<i64>().unwrap(), 4);
        assert!(Value::Float(f64::INFINITY).to::<i64>().is_err());
        assert!(Value::Float(1e300).to::<i64>().is_err());
        assert!(Value::from("KewlSmith").to::<i64>().is_err());
        assert!(Value::Null.to::<i64>().is_err());
    }

    #[test]
    fn test_narrow_integer_range_checks() {
        assert_eq!(Value::Integer(70_000).to::<i32>().unwrap(), 70_000);
        assert!(Value::Integer(i64::from(i32::MAX) + 1).to::<i32>().is_err());
        assert!(Value::Integer(-1).to::<u32>().is_err());
        assert!(Value::Integer(-1).to::<u64>().is_err());
        assert_eq!(Value::from("18446744073709551615").to::<u64>().unwrap(), u64::MAX);
    }

    #[test]
    fn test_u64_accepts_floats_above_i64_range() {
        let big = 2f64.powi(63);
        assert_eq!(Value::Float(big).to::<u64>().unwrap(), 1u64 << 63);
        assert_eq!(Value::Float(1e19).to::<u64>().unwrap(), 10_000_000_000_000_000_000);
        assert_eq!(Value::Float(2.5).to::<u64>().unwrap(), 2);
        assert_eq!(Value::Float(-0.4).to::<u64>().unwrap(), 0);

        assert!(Value::Float(2f64.powi(64)).to::<u64>().is_err());
        assert!(Value::Float(-1.0).to::<u64>().is_err());
        assert!(Value::Float(f64::NAN).to::<u64>().is_err());
    }

    #[test]
    fn test_conversion_error_names_types() {
        match Value::from("abc").to::<i32>() {
            Err(StoreError::TypeConversion { from, to }) => {
                assert_eq!(from, "text");
                assert_eq!(to, "i32");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_float_and_bool_conversions() {
        assert_eq!(Value::Integer(3).to::<f64>().unwrap(), 3.0);
        assert_eq!(
            Value::Integer(9_007_199_254_740_992).to::<f64>().unwrap(),
            9_007_199_254_740_992.0
        );
        assert!(Value::Integer(9_007_199_254_740_993).to::<f64>().is_err());
        assert!(Value::Integer(i64::MAX).to::<f64>().is_err());
        assert_eq!(Value::Integer(i64::MIN).to::<f64>().unwrap(), -(2f64.powi(63)));
        assert_eq!(Value::from("2.25").to::<f64>().unwrap(), 2.25);
        assert!(Value::from(vec![1u8]).to::<f64>().is_err());

        assert!(Value::Integer(5).to::<bool>().unwrap());
        assert!(!Value::Float(0.0).to::<bool>().unwrap());
        assert!(Value::from(" TRUE ").to::<bool>().unwrap());
        assert!(!Value::from("false").to::<bool>().unwrap());
        assert!(Value::from("yes").to::<bool>().is_err());
    }

    #[test]
    fn test_string_and_bytes_conversions() {
        assert_eq!(Value::Integer(1234).to::<String>().unwrap(), "1234");
        assert_eq!(Value::Bool(true).to::<String>().unwrap(), "true");
        assert_eq!(Value::from(b"abc".as_slice()).to::<String>().unwrap(), "abc");
        assert!(Value::from(vec![0xffu8, 0xfe]).to::<String>().is_err());
        assert!(Value::Null.to::<String>().is_err());

        assert_eq!(Value::from("hi").to::<Bytes>().unwrap(), Bytes::from("hi"));
        assert!(Value::Integer(1).to::<Bytes>().is_err());
        assert_eq!(Value::Null.to::<Value>().unwrap(), Value::Null);
    }
}
