//! Store doubles shared by the unit tests.

use std::time::Duration;

use doc2md_job_queue::async_trait;
use doc2md_store::{KvStore, MemoryStore, StoreError};

/// Memory store that refuses writes to keys starting with `prefix`.
#[derive(Debug, Clone)]
pub(crate) struct RejectingStore {
    inner: MemoryStore,
    prefix: &'static str,
}

impl RejectingStore {
    pub(crate) fn new(prefix: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            prefix,
        }
    }
}

#[async_trait]
impl KvStore for RejectingStore {
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        if key.starts_with(self.prefix) {
            return Err(StoreError::Unavailable(format!("write to {key} refused")));
        }
        self.inner.set_ex(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn push(&self, list: &str, value: &[u8]) -> Result<(), StoreError> {
        self.inner.push(list, value).await
    }

    async fn push_capped(
        &self,
        list: &str,
        value: &[u8],
        max_len: usize,
    ) -> Result<(), StoreError> {
        self.inner.push_capped(list, value, max_len).await
    }

    async fn pop_blocking(
        &self,
        list: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.pop_blocking(list, timeout).await
    }

    async fn range(&self, list: &str, limit: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        self.inner.range(list, limit).await
    }

    async fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        self.inner.list_len(list).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
