//! The `document.convert` job.

use std::sync::Arc;
use std::time::Duration;

use doc2md_converter::{convert_bytes, Converter};
use doc2md_job_queue::{async_trait, JobExecutor, JobQueueError, JobRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::job_types;
use crate::model::TaskState;
use crate::store::TaskStore;

/// Message recorded when the uploaded bytes are gone before the worker reads them.
pub const MISSING_FILE_MESSAGE: &str = "File data not found in store";

/// Extension used when the filename has none.
const FALLBACK_EXTENSION: &str = "docx";

/// Payload of a `document.convert` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertPayload {
    pub task_id: String,
    pub filename: String,
}

impl ConvertPayload {
    pub fn new(task_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            filename: filename.into(),
        }
    }

    pub fn into_request(self) -> Result<JobRequest, TaskError> {
        let payload = serde_json::to_value(self)?;
        Ok(JobRequest::new(job_types::DOCUMENT_CONVERT, payload))
    }

    fn parse(payload: Value) -> Result<Self, JobQueueError> {
        serde_json::from_value(payload)
            .map_err(|e| JobQueueError::ExecutionFailed(format!("invalid payload: {e}")))
    }

    fn extension(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => FALLBACK_EXTENSION,
        }
    }
}

/// Executor for `document.convert` jobs.
///
/// Moves the task to `processing`, converts the uploaded bytes and records the
/// outcome on the task. The upload blob is deleted on every path. Jobs whose
/// task is no longer `queued`, or has expired, are acknowledged without
/// touching the task record.
pub struct ConvertDocumentExecutor {
    tasks: TaskStore,
    converter: Arc<dyn Converter>,
}

impl ConvertDocumentExecutor {
    pub fn new(tasks: TaskStore, converter: Arc<dyn Converter>) -> Self {
        Self { tasks, converter }
    }

    async fn convert(&self, job: &ConvertPayload) -> Result<String, String> {
        self.tasks
            .set_processing(&job.task_id, &job.filename)
            .await
            .map_err(|e| e.to_string())?;

        let bytes = match self.tasks.file(&job.task_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(MISSING_FILE_MESSAGE.to_string()),
            Err(e) => return Err(e.to_string()),
        };

        convert_bytes(self.converter.as_ref(), &bytes, job.extension())
            .await
            .map_err(|e| e.to_string())
    }

    /// Record a failure on the task and drop its upload.
    async fn fail_task(&self, job: &ConvertPayload, message: &str) {
        if let Err(e) = self
            .tasks
            .set_failed(&job.task_id, &job.filename, message)
            .await
        {
            warn!(task_id = %job.task_id, error = %e, "could not mark task failed");
        }
        self.discard_upload(job).await;
    }

    async fn discard_upload(&self, job: &ConvertPayload) {
        if let Err(e) = self.tasks.delete_file(&job.task_id).await {
            warn!(task_id = %job.task_id, error = %e, "could not delete upload");
        }
    }
}

impl std::fmt::Debug for ConvertDocumentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertDocumentExecutor")
            .field("tasks", &self.tasks)
            .field("converter", &self.converter.name())
            .finish()
    }
}

#[async_trait]
impl JobExecutor for ConvertDocumentExecutor {
    fn job_type(&self) -> &str {
        job_types::DOCUMENT_CONVERT
    }

    async fn execute(&self, payload: Value) -> Result<(), JobQueueError> {
        let job = ConvertPayload::parse(payload)?;

        let record = self
            .tasks
            .get(&job.task_id)
            .await
            .map_err(|e| JobQueueError::ExecutionFailed(e.to_string()))?;
        let Some(record) = record else {
            info!(task_id = %job.task_id, "task expired while queued, dropping job");
            self.discard_upload(&job).await;
            return Ok(());
        };
        if !record.state.can_transition_to(&TaskState::Processing) {
            info!(task_id = %job.task_id, status = record.state.as_str(), "task is not queued, skipping");
            return Ok(());
        }

        debug!(task_id = %job.task_id, filename = %job.filename, "converting document");

        let markdown = match self.convert(&job).await {
            Ok(markdown) => markdown,
            Err(message) => {
                self.fail_task(&job, &message).await;
                return Err(JobQueueError::ExecutionFailed(message));
            }
        };

        if let Err(e) = self
            .tasks
            .set_success(&job.task_id, &job.filename, &markdown)
            .await
        {
            let message = e.to_string();
            self.fail_task(&job, &message).await;
            return Err(JobQueueError::ExecutionFailed(message));
        }
        self.discard_upload(&job).await;

        info!(task_id = %job.task_id, filename = %job.filename, chars = markdown.len(), "document converted");
        Ok(())
    }

    async fn timed_out(&self, payload: Value, limit: Duration) {
        let Ok(job) = ConvertPayload::parse(payload) else {
            return;
        };
        match self.tasks.get(&job.task_id).await {
            Ok(Some(record)) if record.state.is_terminal() => {
                self.discard_upload(&job).await;
                return;
            }
            Ok(None) => {
                self.discard_upload(&job).await;
                return;
            }
            _ => {}
        }
        let message = format!("Conversion timed out after {}s", limit.as_secs());
        self.fail_task(&job, &message).await;
    }
}
