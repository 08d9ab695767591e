use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use flowgraph_model::{Node, NodeType};

use crate::context::ActionContext;
use crate::dispatcher::{ActionDispatcher, ActionHandler, HandlerKind};
use crate::error::{ActionError, DispatchError};

/// A named boolean test over the action context.
pub type Predicate = Arc<dyn Fn(&ActionContext) -> bool + Send + Sync>;

/// Evaluates the condition a decision node names.
#[derive(Default)]
pub struct ConditionHandler {
  predicates: HashMap<String, Predicate>,
}

impl ConditionHandler {
  pub fn new() -> Self {
    Self::default()
  }

  /// A handler with the built-in conditions:
  /// - `has_low_stock`: upstream `lowStockCount` is greater than zero
  pub fn with_builtins() -> Self {
    Self::new().with("has_low_stock", |ctx| {
      ctx
        .upstream
        .as_ref()
        .and_then(|v| v.get("lowStockCount"))
        .and_then(|v| v.as_f64())
        .is_some_and(|count| count > 0.0)
    })
  }

  /// Add or replace a named condition.
  pub fn with<F>(mut self, name: impl Into<String>, predicate: F) -> Self
  where
    F: Fn(&ActionContext) -> bool + Send + Sync + 'static,
  {
    self.predicates.insert(name.into(), Arc::new(predicate));
    self
  }

  /// Known condition names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  /// Register this handler on decision nodes for every known condition.
  pub fn register_all(self: Arc<Self>, dispatcher: &mut ActionDispatcher) -> Result<(), DispatchError> {
    for name in self.names() {
      dispatcher.register(NodeType::Decision, name, self.clone())?;
    }
    Ok(())
  }
}

#[async_trait]
impl ActionHandler for ConditionHandler {
  fn kind(&self) -> HandlerKind {
    HandlerKind::Condition
  }

  async fn execute(&self, node: &Node, ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    let name = node
      .action()
      .map(|a| a.name)
      .ok_or_else(|| ActionError::UnknownCondition(String::new()))?;
    let predicate = self
      .predicates
      .get(&name)
      .ok_or(ActionError::UnknownCondition(name.clone()))?;

    Ok(serde_json::Value::Bool(predicate(ctx)))
  }
}
