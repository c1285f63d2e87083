use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::warn;

use super::{KvConnection, KvStore};
use crate::error::{ConfigError, StoreError};

/// Redis-backed store. Every `connect()` opens a fresh multiplexed
/// connection that is owned by exactly one probe and closed when that
/// probe finishes, so concurrent probes never share a session.
pub struct RedisStore {
    client: redis::Client,
    connect_timeout: Duration,
}

impl RedisStore {
    /// Parses the URL only; no network traffic happens until `connect()`.
    pub fn open(url: &str, connect_timeout: Duration) -> Result<Self, ConfigError> {
        let client = redis::Client::open(url).map_err(|e| ConfigError::CacheUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            connect_timeout,
        })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn connect(&self) -> Result<Box<dyn KvConnection>, StoreError> {
        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::ConnectTimeout(self.connect_timeout))?
        .map_err(|e| StoreError::Connect(e.to_string()))?;

        Ok(Box::new(RedisConnection {
            conn: Some(conn),
            pending: None,
        }))
    }
}

/// The multiplexed driver task shuts down once the last handle is dropped,
/// which is what `close` (and plain drop) relies on.
struct RedisConnection {
    conn: Option<MultiplexedConnection>,
    /// Marked before `SET` is sent, cleared by a successful `DEL`
    pending: Option<String>,
}

impl RedisConnection {
    fn live(&mut self) -> Result<&mut MultiplexedConnection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }
}

impl Drop for RedisConnection {
    fn drop(&mut self) {
        let (Some(mut conn), Some(key)) = (self.conn.take(), self.pending.take()) else {
            return;
        };
        // Abandoned mid-round; nothing can be awaited here, so the DEL
        // rides on a spawned task holding the last connection handle.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.del::<_, ()>(&key).await {
                        warn!(%key, error = %e, "probe key left behind after cancellation");
                    }
                });
            }
            Err(_) => warn!(%key, "no runtime to delete probe key after cancellation"),
        }
    }
}

#[async_trait]
impl KvConnection for RedisConnection {
    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.pending = Some(key.to_owned());
        self.live()?
            .set::<_, _, ()>(key, value)
            .await
            .map_err(|e| StoreError::command("SET", key, e))
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.live()?
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| StoreError::command("GET", key, e))
    }

    async fn del(&mut self, key: &str) -> Result<(), StoreError> {
        self.live()?
            .del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::command("DEL", key, e))?;
        if self.pending.as_deref() == Some(key) {
            self.pending = None;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        let leftover = match (self.conn.as_mut(), self.pending.take()) {
            (Some(conn), Some(key)) => conn
                .del::<_, ()>(&key)
                .await
                .map_err(|e| StoreError::command("DEL", &key, e)),
            _ => Ok(()),
        };
        drop(self.conn.take());
        leftover
    }
}
