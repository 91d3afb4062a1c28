//! The job record and its typed payload accessors.

use crate::handler::JobHandler;
use crate::value::JobValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One durable unit of work.
///
/// A job is created by [`Manager::add_job`](crate::Manager::add_job), held
/// in the manager's in-memory table keyed by `name`, and mirrored in the
/// durable store as a JSON record. The bound handler is in-memory only; it
/// is re-derived from the [`HandlerRegistry`](crate::HandlerRegistry) by
/// `handler_name` after every reload.
#[derive(Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier; primary key in memory and in the store.
    pub name: String,

    /// Creation time. Never reset on retry; the baseline for eviction by
    /// maximum retry age.
    pub start_at: DateTime<Utc>,

    /// Number of failed attempts so far.
    pub retry: u32,

    /// Caller-supplied payload.
    #[serde(default)]
    pub values: HashMap<String, JobValue>,

    /// Stable identity of the bound handler, used to re-bind after reload.
    #[serde(default)]
    pub handler_name: String,

    /// The bound executable. `None` after reload until re-bound.
    #[serde(skip)]
    pub(crate) handler: Option<Arc<dyn JobHandler>>,
}

impl Job {
    /// Creates a fresh job with `retry = 0` and `start_at = now`.
    pub fn new(name: impl Into<String>, values: HashMap<String, JobValue>) -> Self {
        Self {
            name: name.into(),
            start_at: Utc::now(),
            retry: 0,
            values,
            handler_name: String::new(),
            handler: None,
        }
    }

    /// Binds a handler and records its identity for persistence.
    pub(crate) fn bind(&mut self, handler: Arc<dyn JobHandler>) {
        self.handler_name = handler.name().to_string();
        self.handler = Some(handler);
    }

    /// Returns the raw payload value for `key`.
    pub fn get(&self, key: &str) -> Option<&JobValue> {
        self.values.get(key)
    }

    /// Returns the string payload value for `key`, or `None` when absent or
    /// of another type.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JobValue::as_str)
    }

    /// Returns the integer payload value for `key`.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(JobValue::as_int)
    }

    /// Returns the boolean payload value for `key`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(JobValue::as_bool)
    }

    /// Returns the float payload value for `key`.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(JobValue::as_float)
    }

    /// Returns the byte-sequence payload value for `key`.
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(JobValue::as_bytes)
    }

    /// Returns the duration payload value for `key`.
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        self.get(key).and_then(JobValue::as_duration)
    }

    /// Returns the timestamp payload value for `key`.
    pub fn get_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(JobValue::as_time)
    }

    /// Inserts or replaces a payload value. Handlers may mutate the payload
    /// before returning; the updated payload is persisted on failure.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JobValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns true once the job's age exceeds `max_retry_timeout`.
    ///
    /// A zero timeout expires the job immediately. A timeout too large to
    /// represent never expires it.
    pub fn expired(&self, now: DateTime<Utc>, max_retry_timeout: Duration) -> bool {
        match chrono::Duration::from_std(max_retry_timeout) {
            Ok(age) => now >= self.start_at + age,
            Err(_) => false,
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("start_at", &self.start_at)
            .field("retry", &self.retry)
            .field("values", &self.values)
            .field("handler_name", &self.handler_name)
            .field("handler", &self.handler.as_ref().map(|h| h.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobResult;
    use crate::handler::handler_fn;

    fn payload() -> HashMap<String, JobValue> {
        let mut values = HashMap::new();
        values.insert("count".to_string(), JobValue::from(3i64));
        values.insert("ok".to_string(), JobValue::from(true));
        values.insert("rate".to_string(), JobValue::from(0.25f64));
        values
    }

    #[test]
    fn test_new_job_state() {
        let job = Job::new("t1", payload());
        assert_eq!(job.name, "t1");
        assert_eq!(job.retry, 0);
        assert!(job.handler.is_none());
        assert!(job.handler_name.is_empty());
    }

    #[test]
    fn test_typed_getters() {
        let job = Job::new("t1", payload());
        assert_eq!(job.get_int("count"), Some(3));
        assert_eq!(job.get_bool("ok"), Some(true));
        assert_eq!(job.get_float("rate"), Some(0.25));

        // Absent key and wrong type both read as None, never an error.
        assert_eq!(job.get_int("missing"), None);
        assert_eq!(job.get_str("count"), None);
        assert_eq!(job.get_bool("rate"), None);
    }

    #[test]
    fn test_handler_mutation() {
        let mut job = Job::new("t1", HashMap::new());
        job.set("progress", 10i64);
        assert_eq!(job.get_int("progress"), Some(10));
        job.set("progress", 20i64);
        assert_eq!(job.get_int("progress"), Some(20));
    }

    #[test]
    fn test_serde_round_trip_preserves_state() {
        let mut job = Job::new("t1", payload());
        job.retry = 4;
        job.bind(handler_fn("noop", |_job| -> JobResult<()> { Ok(()) }));

        let json = serde_json::to_string(&job).unwrap();
        let restored: Job = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.name, job.name);
        assert_eq!(restored.start_at, job.start_at);
        assert_eq!(restored.retry, 4);
        assert_eq!(restored.values, job.values);
        assert_eq!(restored.handler_name, "noop");
        // The live handler is never part of the serialized form.
        assert!(restored.handler.is_none());
    }

    #[test]
    fn test_expired() {
        let job = Job::new("t1", HashMap::new());
        let now = Utc::now();

        assert!(job.expired(now, Duration::ZERO));
        assert!(!job.expired(now, Duration::from_secs(3600)));
        assert!(job.expired(
            now + chrono::Duration::seconds(10),
            Duration::from_secs(5)
        ));
        // A timeout beyond chrono's range never expires.
        assert!(!job.expired(now, Duration::MAX));
    }
}
