//! Job queue shared by the doc2md API and its workers.
//!
//! Jobs are serialized onto a list in the shared [`KvStore`](doc2md_store::KvStore)
//! and popped by whichever worker is waiting first ("competing consumers").
//! Each pop hands the job to exactly one worker.
//!
//! # Architecture
//!
//! - [`JobQueueClient`] - enqueues jobs, consumes them, and tracks their runs
//! - [`JobExecutor`] - trait for implementing job handlers
//! - [`JobRun`] - a record of a job execution, kept in the store with a TTL
//! - [`JobRequest`] - a request to enqueue a job
//!
//! Jobs execute once. A failing or timed-out job is marked failed and copied
//! into a capped failure registry ([`JobQueueClient::list_failed`]); the queue
//! never re-delivers it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use doc2md_job_queue::{async_trait, JobExecutor, JobQueueClient, JobQueueError, JobRequest};
//! use doc2md_store::MemoryStore;
//! use serde_json::json;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl JobExecutor for Echo {
//!     fn job_type(&self) -> &str {
//!         "echo"
//!     }
//!
//!     async fn execute(&self, payload: serde_json::Value) -> Result<(), JobQueueError> {
//!         println!("{payload}");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), JobQueueError> {
//!     let client = JobQueueClient::new(Arc::new(MemoryStore::new()), "default");
//!     client.register_executor(Echo).await;
//!     client.enqueue(JobRequest::new("echo", json!({"hello": "world"}))).await?;
//!     client.run_next(Duration::from_secs(1)).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod executor;
mod types;

pub use client::{JobQueueClient, DEFAULT_JOB_TIMEOUT};
pub use error::JobQueueError;
pub use executor::{JobExecutor, NoOpExecutor};
pub use types::{EnqueueResult, Job, JobRequest, JobRun, JobStatus};

// Re-export async_trait for convenience when implementing JobExecutor
pub use async_trait::async_trait;
