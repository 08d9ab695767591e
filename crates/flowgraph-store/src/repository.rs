use flowgraph_model::Flow;
use tracing::{debug, info};

use crate::codec::{deserialize, serialize};
use crate::error::PersistenceError;
use crate::kv::KvStore;

const KEY_PREFIX: &str = "flow:";

/// Saves and loads flows by name through a [`KvStore`].
pub struct FlowRepository<K: KvStore> {
  store: K,
}

impl<K: KvStore> FlowRepository<K> {
  pub fn new(store: K) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &K {
    &self.store
  }

  fn key(name: &str) -> String {
    format!("{}{}", KEY_PREFIX, name)
  }

  /// Persist a flow under its name, replacing any previous version.
  pub async fn save(&self, flow: &Flow) -> Result<(), PersistenceError> {
    let bytes = serialize(flow)?;
    let size = bytes.len();
    self.store.set(&Self::key(&flow.name), bytes).await?;
    info!(flow = %flow.name, bytes = size, "flow_saved");
    Ok(())
  }

  /// Load a flow by name. `Ok(None)` if nothing is stored under that name.
  pub async fn load(&self, name: &str) -> Result<Option<Flow>, PersistenceError> {
    let Some(bytes) = self.store.get(&Self::key(name)).await? else {
      debug!(flow = %name, "flow_not_found");
      return Ok(None);
    };
    let flow = deserialize(&bytes)?;
    debug!(flow = %name, nodes = flow.nodes.len(), edges = flow.edges.len(), "flow_loaded");
    Ok(Some(flow))
  }

  /// Replace `flow` with the stored version of `name`.
  ///
  /// Returns `Ok(false)` if nothing is stored. On error or absence `flow` is
  /// left untouched.
  pub async fn reload_into(&self, name: &str, flow: &mut Flow) -> Result<bool, PersistenceError> {
    match self.load(name).await? {
      Some(loaded) => {
        *flow = loaded;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Delete the stored flow with the given name.
  pub async fn delete(&self, name: &str) -> Result<(), PersistenceError> {
    self.store.delete(&Self::key(name)).await?;
    info!(flow = %name, "flow_deleted");
    Ok(())
  }

  /// Names of all stored flows, sorted.
  pub async fn list(&self) -> Result<Vec<String>, PersistenceError> {
    let keys = self.store.keys(KEY_PREFIX).await?;
    Ok(
      keys
        .into_iter()
        .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
        .collect(),
    )
  }
}
