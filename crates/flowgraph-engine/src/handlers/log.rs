use std::sync::Arc;

use async_trait::async_trait;
use flowgraph_model::Node;
use tracing::info;

use super::template::render;
use crate::context::ActionContext;
use crate::dispatcher::{ActionHandler, HandlerKind};
use crate::error::ActionError;

/// Where rendered log messages go.
pub trait MessageSink: Send + Sync {
  fn write(&self, node_id: &str, message: &str);
}

/// Emits each message as a tracing event.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
  fn write(&self, node_id: &str, message: &str) {
    info!(node_id = %node_id, message = %message, "flow_message");
  }
}

/// Writes the node's rendered `message` (or its label) to a sink.
pub struct LogHandler {
  sink: Arc<dyn MessageSink>,
}

impl LogHandler {
  pub fn new(sink: Arc<dyn MessageSink>) -> Self {
    Self { sink }
  }
}

impl Default for LogHandler {
  fn default() -> Self {
    Self::new(Arc::new(TracingSink))
  }
}

#[async_trait]
impl ActionHandler for LogHandler {
  fn kind(&self) -> HandlerKind {
    HandlerKind::Log
  }

  async fn execute(&self, node: &Node, ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    let message = match node.data.message.as_deref() {
      Some(template) => render(&node.id, "message", template, &ctx.template_context())?,
      None => node.label().to_string(),
    };
    self.sink.write(&node.id, &message);
    Ok(serde_json::Value::Null)
  }
}
