//! Action dispatch.
//!
//! The engine never hard-codes behavior per action: it asks the dispatcher to
//! resolve a node's declared action to a handler and invokes it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use flowgraph_model::{Node, NodeType};

use crate::context::ActionContext;
use crate::error::{ActionError, DispatchError};

/// Category of a handler, checked against the node type at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
  DataFetch,
  Notify,
  Log,
  /// Evaluates a named condition; must return a boolean.
  Condition,
  Custom,
}

/// Registry key: the node type plus the action name the node declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
  pub node_type: NodeType,
  pub action: String,
}

impl ActionKey {
  pub fn new(node_type: NodeType, action: impl Into<String>) -> Self {
    Self {
      node_type,
      action: action.into(),
    }
  }
}

impl fmt::Display for ActionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.node_type, self.action)
  }
}

/// An asynchronous action implementation.
#[async_trait]
pub trait ActionHandler: Send + Sync {
  fn kind(&self) -> HandlerKind;

  /// Execute the action for `node`. One call per node execution.
  async fn execute(
    &self,
    node: &Node,
    ctx: &ActionContext,
  ) -> Result<serde_json::Value, ActionError>;
}

/// Outcome of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
  /// The node declares no action.
  NoAction,
  /// The node declares an action nobody registered.
  Missing(ActionKey),
  /// The handler completed with this result.
  Completed(serde_json::Value),
}

/// Registry from `(NodeType, action)` to handler.
#[derive(Default)]
pub struct ActionDispatcher {
  handlers: HashMap<ActionKey, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a handler for a node type and action name.
  ///
  /// Decision nodes only accept [`HandlerKind::Condition`] handlers and
  /// condition handlers only serve decision nodes.
  pub fn register(
    &mut self,
    node_type: NodeType,
    action: impl Into<String>,
    handler: Arc<dyn ActionHandler>,
  ) -> Result<(), DispatchError> {
    let key = ActionKey::new(node_type, action);
    let kind = handler.kind();

    let is_decision = node_type == NodeType::Decision;
    let is_condition = kind == HandlerKind::Condition;
    if is_decision != is_condition {
      return Err(DispatchError::KindMismatch { key, kind });
    }
    if self.handlers.contains_key(&key) {
      return Err(DispatchError::DuplicateHandler(key));
    }

    self.handlers.insert(key, handler);
    Ok(())
  }

  /// Registered keys, sorted for display.
  pub fn keys(&self) -> Vec<ActionKey> {
    let mut keys: Vec<ActionKey> = self.handlers.keys().cloned().collect();
    keys.sort_by_key(|k| k.to_string());
    keys
  }

  /// Resolve and invoke the handler for `node`.
  ///
  /// A lookup miss is not an error: it resolves to [`Dispatched::Missing`]
  /// and the engine decides what to do with it.
  pub async fn dispatch(&self, node: &Node, ctx: &ActionContext) -> Result<Dispatched, ActionError> {
    let Some(action) = node.action() else {
      return Ok(Dispatched::NoAction);
    };

    let key = ActionKey::new(node.node_type, action.name);
    match self.handlers.get(&key) {
      Some(handler) => handler.execute(node, ctx).await.map(Dispatched::Completed),
      None => Ok(Dispatched::Missing(key)),
    }
  }
}
