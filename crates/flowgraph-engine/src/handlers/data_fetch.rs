use std::sync::Arc;

use async_trait::async_trait;
use flowgraph_model::Node;
use serde_json::json;

use super::template::param_f64;
use crate::context::ActionContext;
use crate::dispatcher::{ActionHandler, HandlerKind};
use crate::error::ActionError;

const DEFAULT_SOURCE: &str = "/inventory";
const DEFAULT_FIELD: &str = "quantity";
const DEFAULT_THRESHOLD: f64 = 10.0;

/// Supplies the collection a data node summarizes.
#[async_trait]
pub trait CollectionSource: Send + Sync {
  async fn collection(&self, node: &Node, ctx: &ActionContext) -> Result<serde_json::Value, ActionError>;
}

/// Reads the collection from the external state by JSON pointer.
///
/// The pointer comes from the node's `source` param, defaulting to
/// `/inventory`.
#[derive(Debug, Clone, Default)]
pub struct StateCollection;

#[async_trait]
impl CollectionSource for StateCollection {
  async fn collection(&self, node: &Node, ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    let pointer = node
      .data
      .params
      .get("source")
      .and_then(|v| v.as_str())
      .unwrap_or(DEFAULT_SOURCE);

    ctx
      .state
      .pointer(pointer)
      .cloned()
      .ok_or_else(|| ActionError::failed(format!("no collection at '{}' in external state", pointer)))
  }
}

/// Summarizes a collection: how many items have `field` below `threshold`.
///
/// Returns `{ total, lowStockCount, lowStockItems }`.
pub struct DataFetchHandler {
  source: Arc<dyn CollectionSource>,
}

impl DataFetchHandler {
  pub fn new(source: Arc<dyn CollectionSource>) -> Self {
    Self { source }
  }
}

impl Default for DataFetchHandler {
  fn default() -> Self {
    Self::new(Arc::new(StateCollection))
  }
}

#[async_trait]
impl ActionHandler for DataFetchHandler {
  fn kind(&self) -> HandlerKind {
    HandlerKind::DataFetch
  }

  async fn execute(&self, node: &Node, ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    let action = node
      .action()
      .ok_or_else(|| ActionError::failed("data node declares no action"))?;
    let field = action.param_str("field").unwrap_or(DEFAULT_FIELD);
    let threshold = param_f64(&action, "threshold", DEFAULT_THRESHOLD)?;

    let collection = self.source.collection(node, ctx).await?;
    let items = collection
      .as_array()
      .ok_or_else(|| ActionError::failed("collection is not an array"))?;

    let low: Vec<serde_json::Value> = items
      .iter()
      .filter(|item| {
        item
          .get(field)
          .and_then(|v| v.as_f64())
          .is_some_and(|value| value < threshold)
      })
      .cloned()
      .collect();

    Ok(json!({
      "total": items.len(),
      "lowStockCount": low.len(),
      "lowStockItems": low,
    }))
  }
}
