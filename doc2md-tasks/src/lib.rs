//! Conversion tasks for doc2md.
//!
//! A task is one uploaded document moving through
//! `queued -> processing -> success | failed`. This crate owns the task
//! records ([`TaskStore`]) and the worker side of the pipeline
//! ([`ConvertDocumentExecutor`]), which is registered on a
//! [`JobQueueClient`](doc2md_job_queue::JobQueueClient).
//!
//! # Job Types
//!
//! - `document.convert` - convert one uploaded document to Markdown
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use doc2md_converter::CommandConverter;
//! use doc2md_job_queue::JobQueueClient;
//! use doc2md_store::MemoryStore;
//! use doc2md_tasks::{register_all_executors, TaskStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let tasks = TaskStore::new(store.clone(), Duration::from_secs(300));
//!     let client = JobQueueClient::new(store, "default");
//!     register_all_executors(&client, tasks, Arc::new(CommandConverter::new("markitdown"))).await;
//! }
//! ```

mod convert;
mod error;
mod model;
mod store;
#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use convert::{ConvertDocumentExecutor, ConvertPayload, MISSING_FILE_MESSAGE};
pub use error::TaskError;
pub use model::{
    allowed_extension, new_task_id, TaskOutcome, TaskRecord, TaskResponse, TaskState,
    ALLOWED_EXTENSIONS, UNKNOWN_ERROR, UNSUPPORTED_TYPE_MESSAGE,
};
pub use store::{TaskStore, DEFAULT_TASK_TTL};

use doc2md_converter::Converter;
use doc2md_job_queue::JobQueueClient;

/// Register all available job executors with the job queue client.
pub async fn register_all_executors(
    client: &JobQueueClient,
    tasks: TaskStore,
    converter: Arc<dyn Converter>,
) {
    client
        .register_executor(ConvertDocumentExecutor::new(tasks, converter))
        .await;
}

/// Job type constants for type-safe job references.
pub mod job_types {
    pub const DOCUMENT_CONVERT: &str = "document.convert";
}
