//! The manager and its dispatch loop.
//!
//! The dispatch loop is the only place handlers ever run. It multiplexes
//! two events: an immediate submission handed off by [`Manager::add_job`],
//! and a periodic tick that re-evaluates every pending job. Success evicts
//! the job from the in-memory table and the durable store; failure
//! increments its retry counter and re-persists it for the next tick.

use crate::config::ManagerConfig;
use crate::error::JobResult;
use crate::handler::{HandlerRegistry, JobHandler};
use crate::job::Job;
use crate::store::JobStore;
use crate::value::JobValue;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Durable job retry manager.
///
/// Construction opens the durable store and spawns the dispatch loop on the
/// current tokio runtime. The loop first reloads every persisted job, so
/// handlers that should survive a restart must be registered in the shared
/// [`HandlerRegistry`] before the manager is created.
///
/// Cloning is cheap; clones share the same loop, table, and store.
#[derive(Clone)]
pub struct Manager {
    shared: Arc<Shared>,
    submit_tx: mpsc::Sender<Job>,
}

struct Shared {
    interval: Duration,
    max_retry_timeout: Duration,
    registry: Arc<HandlerRegistry>,
    store: JobStore,
    jobs: RwLock<HashMap<String, Job>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Manager {
    /// Opens the store at `config.db_path` and starts the dispatch loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ManagerConfig, registry: Arc<HandlerRegistry>) -> JobResult<Self> {
        let store = JobStore::open(&config.db_path)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            interval: config.interval(),
            max_retry_timeout: config.max_retry_timeout(),
            registry,
            store,
            jobs: RwLock::new(HashMap::new()),
            shutdown_tx,
        });

        // Rendezvous-style handoff: add_job blocks until the loop side has
        // accepted the job.
        let (submit_tx, submit_rx) = mpsc::channel(1);
        tokio::spawn(dispatch_loop(shared.clone(), submit_rx, shutdown_rx));

        Ok(Self { shared, submit_tx })
    }

    /// Creates a manager with its own empty registry.
    pub fn with_config(config: ManagerConfig) -> JobResult<Self> {
        Self::new(config, Arc::new(HandlerRegistry::new()))
    }

    /// Registers a named unit of work and hands it to the dispatch loop.
    ///
    /// The handler is added to the registry (first registration under a
    /// name wins), the job is persisted and stored in the in-memory table,
    /// and the call returns once the loop has accepted the job. Execution
    /// is asynchronous relative to the caller, and no post-submission
    /// failure is ever reported back: persistence errors are logged and the
    /// job proceeds in memory regardless.
    pub async fn add_job(
        &self,
        name: impl Into<String>,
        values: HashMap<String, JobValue>,
        handler: Arc<dyn JobHandler>,
    ) {
        let name = name.into();
        self.shared.registry.register(handler.clone());

        let mut job = Job::new(&name, values);
        job.bind(handler);
        info!(job = %name, handler = %job.handler_name, "add job");

        {
            // First writer wins when the name is already pending.
            let mut jobs = self.shared.jobs.write();
            jobs.entry(name.clone()).or_insert_with(|| job.clone());
        }

        if let Err(err) = self.shared.save_job(&job) {
            warn!(job = %name, error = %err, "failed to persist submitted job");
        }

        if self.submit_tx.send(job).await.is_err() {
            warn!(job = %name, "dispatch loop has stopped; job not accepted");
        }
    }

    /// Reloads every persisted job from the store into the in-memory table,
    /// re-binding handlers by name. Called automatically when the dispatch
    /// loop starts; exposed for callers that register handlers late and
    /// want an explicit re-scan.
    pub fn load_jobs(&self) -> JobResult<()> {
        self.shared.load_jobs()
    }

    /// Removes a job from the durable store and the in-memory table.
    pub fn clear_job(&self, job: &Job) {
        self.shared.clear_job(job);
    }

    /// Persists a job's current state in one store transaction.
    pub fn save_job(&self, job: &Job) -> JobResult<()> {
        self.shared.save_job(job)
    }

    /// The handler registry shared with this manager.
    pub fn registry(&self) -> Arc<HandlerRegistry> {
        self.shared.registry.clone()
    }

    /// Number of jobs currently pending.
    pub fn pending(&self) -> usize {
        self.shared.jobs.read().len()
    }

    /// Returns whether a job with `name` is pending.
    pub fn contains(&self, name: &str) -> bool {
        self.shared.jobs.read().contains_key(name)
    }

    /// Snapshot of a pending job's current state.
    pub fn job(&self, name: &str) -> Option<Job> {
        self.shared.jobs.read().get(name).cloned()
    }

    /// Stops the dispatch loop. Pending jobs stay persisted and are
    /// reloaded by the next manager opened on the same store.
    pub fn shutdown(&self) {
        let _ = self.shared.shutdown_tx.send(true);
    }
}

impl Shared {
    fn load_jobs(&self) -> JobResult<()> {
        self.store.scan(|name, record| {
            match self.load_job(record) {
                Ok(job) => {
                    debug!(job = %job.name, retry = job.retry, "loaded job");
                    self.jobs.write().insert(job.name.clone(), job);
                }
                // Unreadable entries are skipped; the rest of the load
                // continues.
                Err(err) => warn!(key = %name, error = %err, "skipping unreadable job record"),
            }
            true
        })
    }

    fn load_job(&self, record: &str) -> JobResult<Job> {
        let mut job: Job = serde_json::from_str(record)?;
        job.handler = self.registry.resolve(&job.handler_name);
        if job.handler.is_none() {
            // Terminal for this job: it is evicted on the next scan.
            warn!(job = %job.name, handler = %job.handler_name, "no registered handler for reloaded job");
        }
        Ok(job)
    }

    fn save_job(&self, job: &Job) -> JobResult<()> {
        let record = serde_json::to_string(job)?;
        debug!(job = %job.name, bytes = record.len(), "save job");
        self.store.save(&job.name, &record)
    }

    fn clear_job(&self, job: &Job) {
        if let Err(err) = self.store.delete(&job.name) {
            warn!(job = %job.name, error = %err, "failed to delete job from store");
        }
        self.jobs.write().remove(&job.name);
        debug!(job = %job.name, "clear job");
    }

    /// Runs one job to completion and applies the success/failure protocol.
    async fn execute(&self, mut job: Job) {
        let Some(handler) = job.handler.clone() else {
            info!(job = %job.name, "job has no bound handler, clearing");
            self.clear_job(&job);
            return;
        };

        match handler.run(&mut job).await {
            Ok(()) => {
                debug!(job = %job.name, retry = job.retry, "job completed");
                self.clear_job(&job);
            }
            Err(err) => {
                job.retry += 1;
                info!(job = %job.name, retry = job.retry, error = %err, "job failed");
                {
                    // Propagate the incremented retry count and any payload
                    // mutation back to the table, unless a different job has
                    // taken the name since this attempt started.
                    let mut jobs = self.jobs.write();
                    if let Some(slot) = jobs.get_mut(&job.name) {
                        if slot.start_at == job.start_at
                            && slot.handler_name == job.handler_name
                        {
                            *slot = job.clone();
                        }
                    }
                }
                if let Err(err) = self.save_job(&job) {
                    warn!(job = %job.name, error = %err, "failed to persist retry state");
                }
            }
        }
    }

    /// Re-evaluates every pending job: expiry first, then handler absence,
    /// then a fresh attempt. There is no per-job next-retry time; every
    /// tick retries everything still pending.
    async fn scan(&self, now: DateTime<Utc>) {
        let pending: Vec<Job> = self.jobs.read().values().cloned().collect();
        debug!(pending = pending.len(), "retry scan");

        for job in pending {
            if job.expired(now, self.max_retry_timeout) {
                info!(job = %job.name, retry = job.retry, "job exceeded max retry timeout, clearing");
                self.clear_job(&job);
                continue;
            }
            self.execute(job).await;
        }
    }
}

/// The single control loop. Exactly one handler executes at a time; a
/// long-running handler delays both new submissions and the retry scan.
async fn dispatch_loop(
    shared: Arc<Shared>,
    mut submit_rx: mpsc::Receiver<Job>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    if let Err(err) = shared.load_jobs() {
        error!(error = %err, "failed to load persisted jobs");
    }

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("dispatch loop shutting down");
                break;
            }
            submitted = submit_rx.recv() => match submitted {
                Some(job) => shared.execute(job).await,
                None => {
                    debug!("all managers dropped, dispatch loop exiting");
                    break;
                }
            },
            // Re-armed after every handled event, like a fresh timer per
            // wait: the tick fires only after a full quiet interval.
            _ = tokio::time::sleep(shared.interval) => {
                shared.scan(Utc::now()).await;
            }
        }
    }
}
