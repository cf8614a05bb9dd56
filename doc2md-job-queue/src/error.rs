//! Error types for the job queue system.

use std::time::Duration;

use doc2md_store::StoreError;
use thiserror::Error;

/// Errors that may occur while interacting with the job queue.
#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("job queue store error: {0}")]
    Store(#[from] StoreError),

    #[error("malformed job payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no executor registered for job type `{0}`")]
    NoExecutor(String),

    #[error("job exceeded its {}s timeout", .0.as_secs())]
    Timeout(Duration),

    #[error("job execution failed: {0}")]
    ExecutionFailed(String),
}
