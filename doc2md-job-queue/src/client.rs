//! Job queue client implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use doc2md_store::KvStore;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::JobQueueError;
use crate::executor::JobExecutor;
use crate::types::{EnqueueResult, Job, JobRequest, JobRun};

/// Maximum number of failed runs kept in the failure registry.
const MAX_FAILED_RUNS: usize = 1000;

/// Default wall-clock budget for a single job.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long job run records stay readable after their last update.
const DEFAULT_RUN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Pause after a store failure before the worker loop polls again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Interface for enqueuing jobs, executing them, and tracking their runs.
///
/// All state lives in the shared store, so any number of clients in any number
/// of processes can enqueue and consume the same queue. A popped job belongs to
/// the worker that popped it.
#[derive(Clone)]
pub struct JobQueueClient {
    store: Arc<dyn KvStore>,
    queue_name: Arc<str>,
    executors: Arc<RwLock<HashMap<String, Arc<dyn JobExecutor>>>>,
    default_timeout: Duration,
    run_ttl: Duration,
}

impl fmt::Debug for JobQueueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueueClient")
            .field("queue_name", &self.queue_name)
            .field(
                "executors",
                &"<RwLock<HashMap<String, Arc<dyn JobExecutor>>>>",
            )
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl JobQueueClient {
    pub fn new(store: Arc<dyn KvStore>, queue_name: impl AsRef<str>) -> Self {
        Self {
            store,
            queue_name: Arc::from(queue_name.as_ref()),
            executors: Arc::new(RwLock::new(HashMap::new())),
            default_timeout: DEFAULT_JOB_TIMEOUT,
            run_ttl: DEFAULT_RUN_TTL,
        }
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_run_ttl(mut self, ttl: Duration) -> Self {
        self.run_ttl = ttl;
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    #[inline]
    fn queue_key(&self) -> String {
        format!("queue:{}", self.queue_name)
    }

    #[inline]
    fn failed_key(&self) -> String {
        format!("queue:{}:failed", self.queue_name)
    }

    #[inline]
    fn run_key(id: Uuid) -> String {
        format!("job:{id}")
    }

    /// Register a job executor for a specific job type.
    pub async fn register_executor<E: JobExecutor + 'static>(&self, executor: E) {
        let job_type = executor.job_type().to_owned();
        let mut executors = self.executors.write().await;
        executors.insert(job_type, Arc::new(executor));
    }

    /// Enqueue a job for asynchronous processing.
    pub async fn enqueue(&self, request: JobRequest) -> Result<EnqueueResult, JobQueueError> {
        let job = Job::from_request(request);
        self.save_run(&JobRun::pending(&job)).await?;

        let encoded = serde_json::to_vec(&job)?;
        self.store.push(&self.queue_key(), &encoded).await?;
        debug!(job_id = %job.id, job_type = %job.job_type, queue = %self.queue_name, "job enqueued");

        Ok(EnqueueResult { job_id: job.id })
    }

    /// Wait up to `timeout` for the next job. A zero timeout waits indefinitely.
    pub async fn next_job(&self, timeout: Duration) -> Result<Option<Job>, JobQueueError> {
        let Some(raw) = self.store.pop_blocking(&self.queue_key(), timeout).await? else {
            return Ok(None);
        };
        let job: Job = serde_json::from_slice(&raw)?;
        Ok(Some(job))
    }

    /// Execute a job once with its registered executor and record the outcome.
    ///
    /// Failures (executor error, timeout, unknown job type) are written to the
    /// run record and the failure registry; they are not retried.
    pub async fn execute(&self, job: Job) -> Result<JobRun, JobQueueError> {
        let mut run = JobRun::pending(&job);
        run.start();
        self.save_run(&run).await?;

        let executor = {
            let executors = self.executors.read().await;
            executors.get(&job.job_type).cloned()
        };

        let outcome = match executor {
            Some(executor) => {
                let limit = job.timeout_or(self.default_timeout);
                match tokio::time::timeout(limit, executor.execute(job.payload.clone())).await {
                    Ok(result) => result,
                    Err(_) => {
                        executor.timed_out(job.payload.clone(), limit).await;
                        Err(JobQueueError::Timeout(limit))
                    }
                }
            }
            None => Err(JobQueueError::NoExecutor(job.job_type.clone())),
        };

        match outcome {
            Ok(()) => {
                run.complete();
                self.save_run(&run).await?;
                info!(job_id = %run.id, job_type = %run.job_name, "job completed");
            }
            Err(e) => {
                run.fail(e.to_string());
                self.save_run(&run).await?;
                self.record_failure(&run).await?;
                warn!(job_id = %run.id, job_type = %run.job_name, error = %e, "job failed");
            }
        }

        Ok(run)
    }

    /// Pop and execute the next job, if one arrives within `timeout`.
    pub async fn run_next(&self, timeout: Duration) -> Result<Option<JobRun>, JobQueueError> {
        match self.next_job(timeout).await? {
            Some(job) => self.execute(job).await.map(Some),
            None => Ok(None),
        }
    }

    /// Consume jobs until `shutdown` is cancelled.
    ///
    /// The current job always runs to completion; cancellation is only observed
    /// while waiting for the next one.
    pub async fn work(&self, shutdown: CancellationToken, poll_timeout: Duration) {
        info!(queue = %self.queue_name, "worker loop started");
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = self.next_job(poll_timeout) => next,
            };

            match next {
                Ok(Some(job)) => {
                    if let Err(e) = self.execute(job).await {
                        error!(error = %e, "failed to record job outcome");
                    }
                }
                Ok(None) => {}
                Err(JobQueueError::Malformed(e)) => {
                    warn!(error = %e, "discarding malformed job");
                }
                Err(e) => {
                    error!(error = %e, "failed to fetch next job");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }
        info!(queue = %self.queue_name, "worker loop stopped");
    }

    /// Get a specific job run by ID.
    pub async fn get_run(&self, id: Uuid) -> Result<Option<JobRun>, JobQueueError> {
        match self.store.get(&Self::run_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Most recent failed runs, newest first.
    pub async fn list_failed(&self, limit: usize) -> Result<Vec<JobRun>, JobQueueError> {
        let raw = self.store.range(&self.failed_key(), limit).await?;
        let mut runs = Vec::with_capacity(raw.len());
        for entry in raw {
            runs.push(serde_json::from_slice(&entry)?);
        }
        Ok(runs)
    }

    /// Number of failed runs currently held in the registry.
    pub async fn count_failed(&self) -> Result<usize, JobQueueError> {
        Ok(self.store.list_len(&self.failed_key()).await?)
    }

    /// Number of jobs waiting to be picked up.
    pub async fn pending_len(&self) -> Result<usize, JobQueueError> {
        Ok(self.store.list_len(&self.queue_key()).await?)
    }

    async fn save_run(&self, run: &JobRun) -> Result<(), JobQueueError> {
        let encoded = serde_json::to_vec(run)?;
        self.store
            .set_ex(&Self::run_key(run.id), &encoded, self.run_ttl)
            .await?;
        Ok(())
    }

    async fn record_failure(&self, run: &JobRun) -> Result<(), JobQueueError> {
        let encoded = serde_json::to_vec(run)?;
        self.store
            .push_capped(&self.failed_key(), &encoded, MAX_FAILED_RUNS)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::NoOpExecutor;
    use crate::types::JobStatus;
    use async_trait::async_trait;
    use doc2md_store::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> JobQueueClient {
        JobQueueClient::new(Arc::new(MemoryStore::new()), "default")
    }

    struct Failing;

    #[async_trait]
    impl JobExecutor for Failing {
        fn job_type(&self) -> &str {
            "always.fails"
        }

        async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
            Err(JobQueueError::ExecutionFailed("converter exploded".into()))
        }
    }

    #[derive(Default)]
    struct Sleepy {
        timeouts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobExecutor for Sleepy {
        fn job_type(&self) -> &str {
            "sleepy"
        }

        async fn execute(&self, _payload: Value) -> Result<(), JobQueueError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn timed_out(&self, _payload: Value, _limit: Duration) {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn enqueue_records_pending_run() {
        let client = client();
        let result = client
            .enqueue(JobRequest::new("noop", json!({"task_id": "t"})))
            .await
            .unwrap();

        let run = client.get_run(result.job_id).await.unwrap().expect("run");
        assert_eq!(run.status, JobStatus::Pending);
        assert_eq!(client.pending_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_next_completes_job() {
        let client = client();
        client.register_executor(NoOpExecutor::new("noop")).await;
        let result = client.enqueue(JobRequest::new("noop", json!({}))).await.unwrap();

        let run = client
            .run_next(Duration::from_millis(50))
            .await
            .unwrap()
            .expect("job");
        assert_eq!(run.id, result.job_id);
        assert_eq!(run.status, JobStatus::Completed);

        let stored = client.get_run(result.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(client.count_failed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_next_times_out_on_empty_queue() {
        let client = client();
        assert!(client
            .run_next(Duration::from_millis(20))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failures_land_in_registry() {
        let client = client();
        client.register_executor(Failing).await;
        client
            .enqueue(JobRequest::new("always.fails", json!({})))
            .await
            .unwrap();

        let run = client
            .run_next(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, JobStatus::Failed);

        let failed = client.list_failed(10).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("converter exploded"));
    }

    #[tokio::test]
    async fn unknown_job_type_fails() {
        let client = client();
        client
            .enqueue(JobRequest::new("mystery", json!({})))
            .await
            .unwrap();
        let run = client
            .run_next(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, JobStatus::Failed);
        assert!(run.error_message.unwrap().contains("mystery"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fails_job_and_notifies_executor() {
        let client = client();
        let timeouts = Arc::new(AtomicUsize::new(0));
        client
            .register_executor(Sleepy {
                timeouts: timeouts.clone(),
            })
            .await;
        client
            .enqueue(JobRequest::new("sleepy", json!({})).with_timeout(Duration::from_secs(2)))
            .await
            .unwrap();

        let run = client
            .run_next(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, JobStatus::Failed);
        assert!(run.error_message.unwrap().contains("timeout"));
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn work_loop_stops_on_cancel() {
        let client = client();
        client.register_executor(NoOpExecutor::new("noop")).await;
        let shutdown = CancellationToken::new();

        let worker = {
            let client = client.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { client.work(shutdown, Duration::from_millis(20)).await })
        };

        let result = client.enqueue(JobRequest::new("noop", json!({}))).await.unwrap();
        for _ in 0..100 {
            let run = client.get_run(result.job_id).await.unwrap().unwrap();
            if run.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            client.get_run(result.job_id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );

        shutdown.cancel();
        worker.await.unwrap();
    }
}
