use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::logger::{ConversionEvent, StatsLogger};

/// Default number of events buffered before new ones are dropped.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Hands conversion events to a background task that writes them to the log.
///
/// Recording never blocks the caller and never fails the request that
/// produced the event: a full or closed channel drops the event with a warning.
#[derive(Debug, Clone)]
pub struct StatsRecorder {
    tx: mpsc::Sender<ConversionEvent>,
}

impl StatsRecorder {
    /// Start the writer task. It exits once every recorder clone is dropped
    /// and the remaining events are flushed.
    pub fn spawn(logger: StatsLogger, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ConversionEvent>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = logger.log_conversion(&event).await {
                    tracing::warn!(error = %e, filename = %event.filename, "failed to log conversion");
                }
            }
            tracing::debug!("stats recorder drained");
        });
        (Self { tx }, handle)
    }

    pub fn record(&self, event: ConversionEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(filename = %event.filename, "stats queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(filename = %event.filename, "stats writer stopped, dropping event");
            }
        }
    }
}
