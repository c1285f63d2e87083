use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{KvConnection, KvStore};
use crate::error::StoreError;

pub const SCHEME: &str = "memory://";

/// In-process key-value map with the same contract as the Redis backend.
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.data.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Session over this map, for wrappers that need the concrete type.
    pub fn session(&self) -> MemoryConnection {
        MemoryConnection {
            data: Some(self.data.clone()),
            pending: None,
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn KvConnection>, StoreError> {
        Ok(Box::new(self.session()))
    }
}

pub struct MemoryConnection {
    data: Option<Arc<Mutex<HashMap<String, String>>>>,
    /// Written but not yet deleted
    pending: Option<String>,
}

impl MemoryConnection {
    fn live(&self) -> Result<&Mutex<HashMap<String, String>>, StoreError> {
        self.data.as_deref().ok_or(StoreError::Closed)
    }

    fn release(&mut self) {
        if let (Some(data), Some(key)) = (self.data.take(), self.pending.take()) {
            data.lock().remove(&key);
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl KvConnection for MemoryConnection {
    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.live()?.lock().insert(key.to_owned(), value.to_owned());
        self.pending = Some(key.to_owned());
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.live()?.lock().get(key).cloned())
    }

    async fn del(&mut self, key: &str) -> Result<(), StoreError> {
        self.live()?.lock().remove(key);
        if self.pending.as_deref() == Some(key) {
            self.pending = None;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.release();
        self.data = None;
        Ok(())
    }
}
