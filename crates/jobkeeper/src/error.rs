//! Job error types.

use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job execution failed. The manager increments the retry counter and
    /// re-persists the job when a handler returns this (or any) error.
    #[error("Job execution failed: {0}")]
    Execution(String),

    /// Durable store error.
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The global manager has not been started, or has been shut down.
    #[error("Manager is not running")]
    NotRunning,

    /// The global manager has already been started.
    #[error("Manager is already running")]
    AlreadyRunning,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl JobError {
    /// Creates an execution failure from any message.
    pub fn execution(msg: impl Into<String>) -> Self {
        JobError::Execution(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_helper() {
        let err = JobError::execution("disk full");
        match err {
            JobError::Execution(msg) => assert_eq!(msg, "disk full"),
            _ => panic!("Expected Execution error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = JobError::execution("oops");
        assert!(err.to_string().contains("oops"));

        let err = JobError::NotRunning;
        assert!(err.to_string().contains("not running"));
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = JobError::from(serde_err);
        assert!(matches!(err, JobError::Serialization(_)));
    }
}
