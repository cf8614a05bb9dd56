use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::{KvStore, StoreError};

/// Store backed by a redis server.
///
/// Regular commands share one auto-reconnecting [`ConnectionManager`]. Blocking
/// pops park the connection they run on, so each in-flight `BRPOP` borrows its
/// own connection from a small idle pool instead.
pub struct RedisStore {
    client: redis::Client,
    endpoint: String,
    conn: ConnectionManager,
    blocking: Mutex<Vec<MultiplexedConnection>>,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl RedisStore {
    /// Connect to the redis server at `url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        let endpoint = redact_credentials(url);
        tracing::debug!(%endpoint, "redis connection manager ready");
        Ok(Self {
            client,
            endpoint,
            conn,
            blocking: Mutex::new(Vec::new()),
        })
    }

    async fn checkout_blocking(&self) -> Result<MultiplexedConnection, StoreError> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn checkin_blocking(&self, conn: MultiplexedConnection) {
        self.blocking.lock().await.push(conn);
    }
}

/// `url` with any `user:password@` part removed, for logs.
fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// Redis expiries have one-second resolution with `SETEX`; never round down to zero.
#[inline]
/// Last index kept by `LTRIM` for a list capped at `max_len`; `None` keeps nothing.
fn trim_stop(max_len: usize) -> Option<isize> {
    let stop = max_len.checked_sub(1)?;
    Some(isize::try_from(stop).unwrap_or(isize::MAX))
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KvStore for RedisStore {
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn push(&self, list: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: usize = conn.lpush(list, value).await?;
        Ok(())
    }

    async fn push_capped(
        &self,
        list: &str,
        value: &[u8],
        max_len: usize,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let Some(stop) = trim_stop(max_len) else {
            let _: usize = conn.del(list).await?;
            return Ok(());
        };
        let _: () = redis::pipe()
            .atomic()
            .lpush(list, value)
            .ignore()
            .ltrim(list, 0, stop)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop_blocking(
        &self,
        list: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.checkout_blocking().await?;
        let popped: Option<(String, Vec<u8>)> = conn.brpop(list, timeout.as_secs_f64()).await?;
        self.checkin_blocking(conn).await;
        Ok(popped.map(|(_, value)| value))
    }

    async fn range(&self, list: &str, limit: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Vec<u8>> = conn.lrange(list, 0, limit as isize - 1).await?;
        Ok(values)
    }

    async fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(list).await?;
        Ok(len)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
