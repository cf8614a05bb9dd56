//! Job executor trait for implementing job handlers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::JobQueueError;

/// Trait for implementing job executors.
///
/// Each job type has exactly one executor registered with the
/// [`JobQueueClient`](crate::JobQueueClient). Jobs are executed once: a
/// returned error marks the run failed and it is not retried.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Returns the job type this executor handles.
    fn job_type(&self) -> &str;

    /// Execute the job with the given payload.
    async fn execute(&self, payload: Value) -> Result<(), JobQueueError>;

    /// Called after `execute` was cancelled for exceeding the job timeout.
    ///
    /// Executors that keep their own state outside the queue use this to record
    /// the failure there.
    async fn timed_out(&self, _payload: Value, _limit: Duration) {}
}

/// A no-op executor that immediately completes jobs.
#[derive(Debug, Default, Clone)]
pub struct NoOpExecutor {
    job_type: String,
}

impl NoOpExecutor {
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
        }
    }
}

#[async_trait]
impl JobExecutor for NoOpExecutor {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
        Ok(())
    }
}
