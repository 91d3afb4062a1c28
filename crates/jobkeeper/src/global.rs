//! Optional process-wide manager instance.
//!
//! A thin forwarding layer over one [`Manager`] for callers that do not
//! want to pass an instance around. The primary API is instance-based;
//! this wrapper only adds explicit init/teardown on top of it.

use crate::config::ManagerConfig;
use crate::error::{JobError, JobResult};
use crate::handler::{HandlerRegistry, JobHandler};
use crate::job::Job;
use crate::manager::Manager;
use crate::value::JobValue;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

static GLOBAL: Lazy<RwLock<Option<Manager>>> = Lazy::new(|| RwLock::new(None));

/// Starts the process-wide manager. Handlers already present in `registry`
/// are available for re-binding when the startup reload runs.
///
/// Returns [`JobError::AlreadyRunning`] when a global manager exists.
pub fn start(config: ManagerConfig, registry: Arc<HandlerRegistry>) -> JobResult<()> {
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        return Err(JobError::AlreadyRunning);
    }
    *slot = Some(Manager::new(config, registry)?);
    Ok(())
}

/// Returns a handle to the running global manager.
pub fn manager() -> JobResult<Manager> {
    GLOBAL.read().clone().ok_or(JobError::NotRunning)
}

/// Returns whether the global manager is running.
pub fn is_running() -> bool {
    GLOBAL.read().is_some()
}

/// Forwards to [`Manager::add_job`] on the global instance.
pub async fn add_job(
    name: impl Into<String>,
    values: HashMap<String, JobValue>,
    handler: Arc<dyn JobHandler>,
) -> JobResult<()> {
    let manager = manager()?;
    manager.add_job(name, values, handler).await;
    Ok(())
}

/// Forwards to [`Manager::clear_job`] on the global instance.
pub fn clear_job(job: &Job) -> JobResult<()> {
    manager()?.clear_job(job);
    Ok(())
}

/// Forwards to [`Manager::load_jobs`] on the global instance.
pub fn load_jobs() -> JobResult<()> {
    manager()?.load_jobs()
}

/// Stops the global manager and clears the slot so `start` may be called
/// again.
pub fn shutdown() -> JobResult<()> {
    let mut slot = GLOBAL.write();
    match slot.take() {
        Some(manager) => {
            manager.shutdown();
            Ok(())
        }
        None => Err(JobError::NotRunning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    // The whole lifecycle lives in one test: the slot is process-wide and
    // tests run in parallel.
    #[tokio::test]
    async fn test_global_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig::default()
            .with_db_path(dir.path().join("jobs.db").to_string_lossy().into_owned())
            .with_interval(Duration::from_millis(20));

        // Calls before start are rejected.
        assert!(matches!(
            add_job("early", HashMap::new(), handler_fn("noop", |_job| Ok(()))).await,
            Err(JobError::NotRunning)
        ));
        assert!(!is_running());

        let registry = Arc::new(HandlerRegistry::new());
        start(config.clone(), registry.clone()).unwrap();
        assert!(is_running());

        // Double start is rejected.
        assert!(matches!(
            start(config, registry),
            Err(JobError::AlreadyRunning)
        ));

        let calls = Arc::new(AtomicU32::new(0));
        let handler = {
            let calls = calls.clone();
            handler_fn("global_ok", move |_job| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        add_job("g1", HashMap::new(), handler).await.unwrap();
        sleep(Duration::from_millis(100)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager().unwrap().pending(), 0);

        shutdown().unwrap();
        assert!(!is_running());
        assert!(matches!(shutdown(), Err(JobError::NotRunning)));
    }
}
