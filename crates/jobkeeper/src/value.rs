//! Dynamically-typed payload values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single payload value carried by a job.
///
/// Each job holds a `HashMap<String, JobValue>` supplied at creation and
/// persisted alongside the retry state. Typed projections return `None`
/// when the value holds a different variant; callers wanting the old
/// zero-value-on-mismatch behavior can chain `unwrap_or_default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum JobValue {
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Floating point.
    Float(f64),
    /// Raw byte sequence.
    Bytes(Vec<u8>),
    /// Span of time.
    Duration(Duration),
    /// Point in time.
    Time(DateTime<Utc>),
}

impl JobValue {
    /// Returns the string value, or `None` for any other variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JobValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, or `None` for any other variant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            JobValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value, or `None` for any other variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JobValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the float value, or `None` for any other variant.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            JobValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the byte sequence, or `None` for any other variant.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            JobValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the duration value, or `None` for any other variant.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            JobValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the timestamp value, or `None` for any other variant.
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            JobValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<&str> for JobValue {
    fn from(s: &str) -> Self {
        JobValue::String(s.to_string())
    }
}

impl From<String> for JobValue {
    fn from(s: String) -> Self {
        JobValue::String(s)
    }
}

impl From<i64> for JobValue {
    fn from(n: i64) -> Self {
        JobValue::Int(n)
    }
}

impl From<i32> for JobValue {
    fn from(n: i32) -> Self {
        JobValue::Int(n.into())
    }
}

impl From<bool> for JobValue {
    fn from(b: bool) -> Self {
        JobValue::Bool(b)
    }
}

impl From<f64> for JobValue {
    fn from(f: f64) -> Self {
        JobValue::Float(f)
    }
}

impl From<Vec<u8>> for JobValue {
    fn from(b: Vec<u8>) -> Self {
        JobValue::Bytes(b)
    }
}

impl From<Duration> for JobValue {
    fn from(d: Duration) -> Self {
        JobValue::Duration(d)
    }
}

impl From<DateTime<Utc>> for JobValue {
    fn from(t: DateTime<Utc>) -> Self {
        JobValue::Time(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &JobValue) -> JobValue {
        let json = serde_json::to_string(value).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_serde_round_trip_all_variants() {
        let values = vec![
            JobValue::from("hello"),
            JobValue::from(-42i64),
            JobValue::from(true),
            JobValue::from(2.5f64),
            JobValue::from(vec![0u8, 255, 7]),
            JobValue::from(Duration::from_millis(1500)),
            JobValue::from(Utc::now()),
        ];

        for value in &values {
            assert_eq!(&round_trip(value), value);
        }
    }

    #[test]
    fn test_typed_projections() {
        let v = JobValue::from(5i64);
        assert_eq!(v.as_int(), Some(5));
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_bool(), None);

        let v = JobValue::from("text");
        assert_eq!(v.as_str(), Some("text"));
        assert_eq!(v.as_int(), None);

        let v = JobValue::from(Duration::from_secs(3));
        assert_eq!(v.as_duration(), Some(Duration::from_secs(3)));
        assert_eq!(v.as_time(), None);
    }

    #[test]
    fn test_zero_value_recovery() {
        // The projections compose with unwrap_or_default for callers that
        // want a zero value on absence or type mismatch.
        let v = JobValue::from(true);
        assert_eq!(v.as_int().unwrap_or_default(), 0);
        assert_eq!(v.as_bool().unwrap_or_default(), true);
    }
}
