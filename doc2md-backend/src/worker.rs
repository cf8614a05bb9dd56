//! Worker loops draining the conversion queue.

use std::time::Duration;

use doc2md_job_queue::JobQueueClient;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Start `concurrency` competing worker loops on `queue`.
///
/// Each loop finishes its current job and exits once `shutdown` is cancelled.
pub fn spawn_workers(
    queue: &JobQueueClient,
    concurrency: usize,
    poll_timeout: Duration,
    shutdown: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..concurrency.max(1))
        .map(|index| {
            let queue = queue.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tracing::debug!(worker = index, "worker starting");
                queue.work(shutdown, poll_timeout).await;
            })
        })
        .collect()
}

/// Wait for every worker loop to exit.
pub async fn join_workers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker task panicked");
        }
    }
}

/// Resolves on Ctrl-C, cancelling `shutdown`.
pub async fn shutdown_on_ctrl_c(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            } else {
                tracing::info!("shutdown requested");
            }
            shutdown.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use doc2md_job_queue::{JobRequest, NoOpExecutor};
    use doc2md_store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn workers_drain_queue_and_stop_on_cancel() {
        let queue = JobQueueClient::new(Arc::new(MemoryStore::new()), "default");
        queue.register_executor(NoOpExecutor::new("noop")).await;
        for _ in 0..5 {
            queue.enqueue(JobRequest::new("noop", json!({}))).await.unwrap();
        }

        let shutdown = CancellationToken::new();
        let handles = spawn_workers(&queue, 3, Duration::from_millis(20), &shutdown);

        for _ in 0..100 {
            if queue.pending_len().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(queue.pending_len().await.unwrap(), 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), join_workers(handles))
            .await
            .expect("workers should stop");
    }
}
