//! In-process store with the same expiry and list semantics as the redis backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{KvStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    #[inline]
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// How often [`MemoryStore::spawn_reaper`] sweeps expired keys by default.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Store backed by process memory.
///
/// Expiry is evaluated against tokio's clock, so tests running with a paused
/// runtime can move time forward with `tokio::time::advance`. Reads drop the
/// expired key they touch; keys that are never read again are reclaimed by the
/// background sweep started with [`MemoryStore::spawn_reaper`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    values: DashMap<String, Entry>,
    lists: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    list_ready: Notify,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store: every operation fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Drop every expired key.
    pub fn purge_expired(&self) {
        self.inner.purge_expired();
    }

    /// Number of keys currently held, including expired keys not yet purged.
    pub fn key_count(&self) -> usize {
        self.inner.values.len()
    }

    /// Purge expired keys every `every` until the last handle to the store is dropped.
    pub fn spawn_reaper(&self, every: Duration) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let before = inner.values.len();
                inner.purge_expired();
                let purged = before.saturating_sub(inner.values.len());
                if purged > 0 {
                    tracing::debug!(purged, "expired memory store keys purged");
                }
            }
        })
    }

    #[inline]
    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    async fn try_pop(&self, list: &str) -> Option<Vec<u8>> {
        let mut lists = self.inner.lists.lock().await;
        let queue = lists.get_mut(list)?;
        let value = queue.pop_back();
        if queue.is_empty() {
            lists.remove(list);
        }
        value
    }
}

impl Inner {
    fn purge_expired(&self) {
        let now = Instant::now();
        self.values.retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.check_online()?;
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.inner.values.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_online()?;
        let now = Instant::now();
        let value = match self.inner.values.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // expired: drop it so the map does not grow without bound
        self.inner
            .values
            .remove_if(key, |_, entry| !entry.is_live(now));
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let now = Instant::now();
        Ok(self
            .inner
            .values
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn push(&self, list: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_online()?;
        {
            let mut lists = self.inner.lists.lock().await;
            lists
                .entry(list.to_owned())
                .or_default()
                .push_front(value.to_vec());
        }
        self.inner.list_ready.notify_waiters();
        Ok(())
    }

    async fn push_capped(
        &self,
        list: &str,
        value: &[u8],
        max_len: usize,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        {
            let mut lists = self.inner.lists.lock().await;
            if max_len == 0 {
                lists.remove(list);
            } else {
                let queue = lists.entry(list.to_owned()).or_default();
                queue.push_front(value.to_vec());
                queue.truncate(max_len);
            }
        }
        self.inner.list_ready.notify_waiters();
        Ok(())
    }

    async fn pop_blocking(
        &self,
        list: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        loop {
            self.check_online()?;

            // Register interest before checking so a push between the check and
            // the wait is not missed.
            let notified = self.inner.list_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_pop(list).await {
                return Ok(Some(value));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified.as_mut())
                        .await
                        .is_err()
                    {
                        return Ok(None);
                    }
                }
                None => notified.as_mut().await,
            }
        }
    }

    async fn range(&self, list: &str, limit: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_online()?;
        let lists = self.inner.lists.lock().await;
        Ok(lists
            .get(list)
            .map(|queue| queue.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        self.check_online()?;
        let lists = self.inner.lists.lock().await;
        Ok(lists.get(list).map_or(0, VecDeque::len))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}
