//! Expiring key-value store used by doc2md for task state and the job queue.
//!
//! The service never talks to a concrete store directly. Every component is
//! handed an `Arc<dyn KvStore>` at construction time, so production wiring can
//! use [`RedisStore`] while tests and the embedded development mode use
//! [`MemoryStore`].
//!
//! # Semantics
//!
//! - Keys written with [`KvStore::set_ex`] expire after their TTL; every write
//!   resets the expiry.
//! - Lists behave like Redis lists used as a queue: [`KvStore::push`] adds to the
//!   head and [`KvStore::pop_blocking`] removes from the tail, so consumers see
//!   FIFO order. A popped value is delivered to exactly one caller.

mod error;
mod memory;
mod redis_store;

pub use error::StoreError;
pub use memory::{MemoryStore, DEFAULT_PURGE_INTERVAL};
pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;

/// Operations the service needs from its key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value and resetting its expiry.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Read the value stored under `key`, or `None` if it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key`. Returns whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Push `value` onto the head of `list`.
    async fn push(&self, list: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Push `value` onto the head of `list` and trim the list to `max_len` entries.
    async fn push_capped(&self, list: &str, value: &[u8], max_len: usize)
        -> Result<(), StoreError>;

    /// Pop from the tail of `list`, waiting up to `timeout` for a value.
    ///
    /// A zero timeout waits indefinitely.
    async fn pop_blocking(
        &self,
        list: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read up to `limit` entries from the head of `list` (most recently pushed first).
    async fn range(&self, list: &str, limit: usize) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Number of entries in `list`.
    async fn list_len(&self, list: &str) -> Result<usize, StoreError>;

    /// Trivial round-trip used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
