//! Job handlers and the handler registry.

use crate::error::JobResult;
use crate::job::Job;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The executable behavior bound to a job.
///
/// `name` must be stable across process restarts: it is persisted with the
/// job and used to re-bind the handler after reload. Anonymous identities
/// derived from code addresses are deliberately not supported; callers
/// choose their own names.
///
/// # Example
///
/// ```rust,ignore
/// use jobkeeper::{Job, JobHandler, JobResult};
///
/// struct SendEmail;
///
/// #[async_trait::async_trait]
/// impl JobHandler for SendEmail {
///     fn name(&self) -> &str {
///         "send_email"
///     }
///
///     async fn run(&self, job: &mut Job) -> JobResult<()> {
///         let to = job.get_str("to").unwrap_or_default();
///         // Send the email here; an Err return schedules a retry.
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Stable identity of this handler.
    fn name(&self) -> &str;

    /// Performs the job's work. An `Err` return increments the job's retry
    /// counter and re-persists it for the next periodic scan.
    async fn run(&self, job: &mut Job) -> JobResult<()>;
}

/// Adapter exposing a plain closure as a [`JobHandler`].
struct FnHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&mut Job) -> JobResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, job: &mut Job) -> JobResult<()> {
        (self.f)(job)
    }
}

/// Wraps a closure as a [`JobHandler`] under the given stable name.
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn JobHandler>
where
    F: Fn(&mut Job) -> JobResult<()> + Send + Sync + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f,
    })
}

/// Mapping from stable handler identity to the handler itself.
///
/// Entries are added and never removed for the lifetime of the process.
/// Registration and lookup are safe from any thread.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own name. The first registration wins;
    /// re-registering an existing name is a no-op, not an overwrite, and
    /// never an error. Returns whether the handler was inserted.
    pub fn register(&self, handler: Arc<dyn JobHandler>) -> bool {
        let mut handlers = self.handlers.write();
        match handlers.entry(handler.name().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!(handler = handler.name(), "registered job handler");
                slot.insert(handler);
                true
            }
        }
    }

    /// Looks up a handler by name. Absence is an expected outcome: a
    /// handler may have been removed or renamed between process versions.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.read().get(name).cloned()
    }

    /// Returns whether a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}
