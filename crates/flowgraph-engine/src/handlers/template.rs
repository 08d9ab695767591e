use flowgraph_model::ActionDescriptor;
use minijinja::{Environment, Value};

use crate::error::ActionError;

/// Render a message template against a template context.
pub fn render(node_id: &str, param: &str, template: &str, context: &serde_json::Value) -> Result<String, ActionError> {
  let env = Environment::new();
  env
    .render_str(template, Value::from_serialize(context))
    .map_err(|e| ActionError::invalid_param(param, format!("node '{}': failed to render template: {}", node_id, e)))
}

/// Read a numeric parameter, accepting numbers and numeric strings.
pub(crate) fn param_f64(action: &ActionDescriptor, key: &str, default: f64) -> Result<f64, ActionError> {
  match action.params.get(key) {
    None | Some(serde_json::Value::Null) => Ok(default),
    Some(serde_json::Value::Number(n)) => n
      .as_f64()
      .ok_or_else(|| ActionError::invalid_param(key, "not a finite number")),
    Some(serde_json::Value::String(s)) => s
      .trim()
      .parse()
      .map_err(|_| ActionError::invalid_param(key, format!("'{}' is not a number", s))),
    Some(other) => Err(ActionError::invalid_param(key, format!("expected a number, got {}", other))),
  }
}
