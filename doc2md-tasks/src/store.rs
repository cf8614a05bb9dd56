//! Task metadata, upload and result blobs in the shared store.

use std::sync::Arc;
use std::time::Duration;

use doc2md_store::KvStore;
use tracing::debug;

use crate::error::TaskError;
use crate::model::{TaskOutcome, TaskRecord, TaskResponse, TaskState};

/// Default lifetime of every task key, measured from its last write.
pub const DEFAULT_TASK_TTL: Duration = Duration::from_secs(300);

/// Reads and writes the three keys belonging to a task.
///
/// `task:{id}` holds the JSON [`TaskRecord`], `file:{id}` the uploaded bytes and
/// `markdown:{id}` the conversion result. Each key expires independently.
#[derive(Clone)]
pub struct TaskStore {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore").field("ttl", &self.ttl).finish()
    }
}

impl TaskStore {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    fn task_key(id: &str) -> String {
        format!("task:{id}")
    }

    fn file_key(id: &str) -> String {
        format!("file:{id}")
    }

    fn markdown_key(id: &str) -> String {
        format!("markdown:{id}")
    }

    /// Store the upload and a `queued` record for a new task.
    pub async fn create(&self, id: &str, filename: &str, bytes: &[u8]) -> Result<(), TaskError> {
        self.store.set_ex(&Self::file_key(id), bytes, self.ttl).await?;
        self.write_state(id, filename, TaskState::Queued).await?;
        debug!(task_id = id, filename, size = bytes.len(), "task created");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<TaskRecord>, TaskError> {
        match self.store.get(&Self::task_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the record for `id`, resetting its expiry.
    pub async fn write_state(
        &self,
        id: &str,
        filename: &str,
        state: TaskState,
    ) -> Result<(), TaskError> {
        let record = TaskRecord::new(filename, state);
        let encoded = serde_json::to_vec(&record)?;
        self.store
            .set_ex(&Self::task_key(id), &encoded, self.ttl)
            .await?;
        Ok(())
    }

    pub async fn set_processing(&self, id: &str, filename: &str) -> Result<(), TaskError> {
        self.write_state(id, filename, TaskState::Processing).await
    }

    /// Store the markdown, then flip the record to `success`.
    ///
    /// A reader that sees `success` can therefore always find the result until
    /// it expires.
    pub async fn set_success(
        &self,
        id: &str,
        filename: &str,
        markdown: &str,
    ) -> Result<(), TaskError> {
        self.store
            .set_ex(&Self::markdown_key(id), markdown.as_bytes(), self.ttl)
            .await?;
        self.write_state(id, filename, TaskState::Success).await
    }

    pub async fn set_failed(
        &self,
        id: &str,
        filename: &str,
        error: impl Into<String>,
    ) -> Result<(), TaskError> {
        self.write_state(id, filename, TaskState::failed(error)).await
    }

    pub async fn file(&self, id: &str) -> Result<Option<Vec<u8>>, TaskError> {
        Ok(self.store.get(&Self::file_key(id)).await?)
    }

    pub async fn delete_file(&self, id: &str) -> Result<bool, TaskError> {
        Ok(self.store.delete(&Self::file_key(id)).await?)
    }

    pub async fn markdown(&self, id: &str) -> Result<Option<String>, TaskError> {
        Ok(self
            .store
            .get(&Self::markdown_key(id))
            .await?
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
    }

    /// What a client polling `id` should see, or `None` if the task is unknown or expired.
    pub async fn response(&self, id: &str) -> Result<Option<TaskResponse>, TaskError> {
        let Some(record) = self.get(id).await? else {
            return Ok(None);
        };
        let markdown = match record.state {
            TaskState::Success => self.markdown(id).await?,
            _ => None,
        };
        Ok(Some(TaskResponse {
            task_id: id.to_string(),
            outcome: TaskOutcome::from_state(record.state, markdown),
        }))
    }
}
