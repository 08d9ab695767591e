use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;

/// Key-value capability used to persist flows.
///
/// Values are opaque bytes. The trait is async to support networked backends.
#[async_trait]
pub trait KvStore: Send + Sync {
  /// Get a value by key. `Ok(None)` if the key is absent.
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

  /// Set a value, replacing any previous one.
  async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

  /// Delete a value. Deleting an absent key is not an error.
  async fn delete(&self, key: &str) -> Result<(), StoreError>;

  /// List keys starting with `prefix`, sorted.
  async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory KV store implementation.
///
/// Suitable for embedding or testing.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
  data: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    let data = self.data.read().unwrap_or_else(|e| e.into_inner());
    Ok(data.get(key).cloned())
  }

  async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
    let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
    data.insert(key.to_string(), value);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
    data.remove(key);
    Ok(())
  }

  async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    let data = self.data.read().unwrap_or_else(|e| e.into_inner());
    let mut keys: Vec<String> = data
      .keys()
      .filter(|k| k.starts_with(prefix))
      .cloned()
      .collect();
    keys.sort();
    Ok(keys)
  }
}
