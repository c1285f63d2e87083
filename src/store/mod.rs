pub mod memory;
pub mod redis_client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConfigError, StoreError};

pub use self::memory::MemoryStore;
pub use self::redis_client::RedisStore;

/// Opens sessions to a plain key-value cache (`SET`, `GET`, `DEL`, no TTL).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn KvConnection>, StoreError>;
}

/// One session owned by a single probe invocation.
///
/// Implementations must release the session when dropped, so a future
/// cancelled mid-round still gives the connection back. `close` is the
/// orderly path and must be idempotent.
///
/// A key passed to `set` stays pending until a successful `del`. Pending
/// keys are removed by `close`, and by `Drop` when the session is
/// abandoned, so no key outlives the session that wrote it.
#[async_trait]
pub trait KvConnection: Send {
    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError>;
    async fn del(&mut self, key: &str) -> Result<(), StoreError>;
    async fn close(&mut self) -> Result<(), StoreError>;
}

/// Picks a backend from the configured URL: `memory://` selects the
/// in-process map, anything else is handed to the Redis client.
pub fn from_url(url: &str, connect_timeout: Duration) -> Result<Arc<dyn KvStore>, ConfigError> {
    if url.starts_with(memory::SCHEME) {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(RedisStore::open(url, connect_timeout)?))
}
