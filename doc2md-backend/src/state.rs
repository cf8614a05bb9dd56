use std::sync::Arc;

use doc2md_config::SecurityConfig;
use doc2md_job_queue::JobQueueClient;
use doc2md_stats::{StatsLogger, StatsRecorder};
use doc2md_store::KvStore;
use doc2md_tasks::TaskStore;

/// Shared application state passed to every route handler.
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub tasks: TaskStore,
    pub job_queue: JobQueueClient,
    pub stats: StatsLogger,
    pub recorder: StatsRecorder,
    pub security: Arc<SecurityConfig>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tasks: self.tasks.clone(),
            job_queue: self.job_queue.clone(),
            stats: self.stats.clone(),
            recorder: self.recorder.clone(),
            security: Arc::clone(&self.security),
        }
    }
}

impl AppState {
    /// Build a fully initialised state container from its constituent parts.
    pub fn new(
        tasks: TaskStore,
        job_queue: JobQueueClient,
        stats: StatsLogger,
        recorder: StatsRecorder,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store: Arc::clone(tasks.kv()),
            tasks,
            job_queue,
            stats,
            recorder,
            security: Arc::new(security),
        }
    }

    /// Configured shared secret, if any.
    pub fn deploy_token(&self) -> Option<&str> {
        self.security.deploy_token()
    }
}
