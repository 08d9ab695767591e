use std::sync::Arc;

/// Externally supplied state handed to every action handler, e.g. the
/// current inventory. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ExternalState(Arc<serde_json::Value>);

impl ExternalState {
  pub fn new(value: serde_json::Value) -> Self {
    Self(Arc::new(value))
  }

  pub fn value(&self) -> &serde_json::Value {
    &self.0
  }

  /// Look up a value by JSON pointer, e.g. `/inventory`.
  pub fn pointer(&self, pointer: &str) -> Option<&serde_json::Value> {
    self.0.pointer(pointer)
  }
}

impl From<serde_json::Value> for ExternalState {
  fn from(value: serde_json::Value) -> Self {
    Self::new(value)
  }
}

/// Everything a handler may read besides the node itself.
#[derive(Debug, Clone)]
pub struct ActionContext {
  pub run_id: String,
  pub state: ExternalState,
  /// Result of the node that led here, if any.
  pub upstream: Option<serde_json::Value>,
  /// Results of nodes completed earlier in this run, keyed by node id.
  pub results: serde_json::Map<String, serde_json::Value>,
}

impl ActionContext {
  pub fn new(run_id: impl Into<String>, state: ExternalState) -> Self {
    Self {
      run_id: run_id.into(),
      state,
      upstream: None,
      results: serde_json::Map::new(),
    }
  }

  pub fn with_upstream(mut self, upstream: serde_json::Value) -> Self {
    self.upstream = Some(upstream);
    self
  }

  /// Context used for rendering message templates.
  pub fn template_context(&self) -> serde_json::Value {
    serde_json::json!({
      "upstream": self.upstream.clone().unwrap_or(serde_json::Value::Null),
      "results": self.results,
      "state": self.state.value(),
    })
  }
}
