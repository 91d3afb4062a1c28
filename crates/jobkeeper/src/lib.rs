//! Jobkeeper - Durable In-Process Job Retry Manager
//!
//! An embedded job retry manager with:
//! - Named units of work carrying dynamically-typed key/value payloads
//! - Persist-before-ack durability over an embedded SQLite store
//! - A single dispatch loop multiplexing immediate submissions with a
//!   periodic retry scan of every pending job
//! - Handler re-binding by stable name after a process restart
//! - Eviction once a job exceeds its maximum retry age
//!
//! Jobs are retried on a fixed cadence until they succeed or age out; both
//! outcomes evict the job from memory and from the store. Exactly one
//! handler runs at a time, so the retry/persist protocol never observes
//! concurrent execution.
//!
//! # Example
//!
//! ```rust,ignore
//! use jobkeeper::{handler_fn, HandlerRegistry, JobError, Manager, ManagerConfig};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> jobkeeper::JobResult<()> {
//!     let registry = Arc::new(HandlerRegistry::new());
//!     let manager = Manager::new(
//!         ManagerConfig::default().with_db_path("orders.db"),
//!         registry,
//!     )?;
//!
//!     let mut values = HashMap::new();
//!     values.insert("order_id".to_string(), 42i64.into());
//!
//!     manager
//!         .add_job("notify-42", values, handler_fn("notify", |job| {
//!             let order = job.get_int("order_id").unwrap_or_default();
//!             // An Err return schedules a retry on the next scan.
//!             notify_warehouse(order).map_err(JobError::execution)
//!         }))
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod global;
pub mod handler;
pub mod job;
pub mod manager;
pub mod store;
pub mod value;

pub use config::{ManagerConfig, DEFAULT_INTERVAL, DEFAULT_MAX_RETRY_TIMEOUT};
pub use error::{JobError, JobResult};
pub use handler::{handler_fn, HandlerRegistry, JobHandler};
pub use job::Job;
pub use manager::Manager;
pub use store::JobStore;
pub use value::JobValue;

/// Re-export of commonly used items.
pub mod prelude {
    pub use crate::handler::{handler_fn, HandlerRegistry, JobHandler};
    pub use crate::{Job, JobError, JobResult, JobValue, Manager, ManagerConfig};
}
