use std::sync::Arc;

use async_trait::async_trait;
use flowgraph_model::Node;
use tracing::info;

use super::template::render;
use crate::context::ActionContext;
use crate::dispatcher::{ActionHandler, HandlerKind};
use crate::error::ActionError;

/// Delivers a notification. Implementations talk to email, chat, etc.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ActionError>;
}

/// Sends the node's rendered `message` to its `recipient`.
///
/// The node label is used as the subject.
pub struct NotifyHandler {
  notifier: Arc<dyn Notifier>,
}

impl NotifyHandler {
  pub fn new(notifier: Arc<dyn Notifier>) -> Self {
    Self { notifier }
  }
}

#[async_trait]
impl ActionHandler for NotifyHandler {
  fn kind(&self) -> HandlerKind {
    HandlerKind::Notify
  }

  async fn execute(&self, node: &Node, ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    let recipient = node
      .data
      .recipient
      .as_deref()
      .map(str::trim)
      .filter(|r| !r.is_empty())
      .ok_or_else(|| ActionError::invalid_param("recipient", "a recipient is required"))?;

    let body = match node.data.message.as_deref() {
      Some(template) => render(&node.id, "message", template, &ctx.template_context())?,
      None => String::new(),
    };

    self.notifier.send(recipient, node.label(), &body).await?;
    info!(node_id = %node.id, recipient = %recipient, "notification_sent");

    Ok(serde_json::json!({ "sent": true, "recipient": recipient }))
  }
}
