use serde::{Deserialize, Serialize};

use flowgraph_config::{NodeData, NodeType, Position};

/// Execution state of a node within a run.
///
/// `Idle -> Executing -> {Executed, Failed}`; every run starts from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
  #[default]
  Idle,
  Executing,
  Executed,
  Failed,
}

/// The action a node asks the dispatcher to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
  pub name: String,
  pub params: serde_json::Map<String, serde_json::Value>,
}

impl ActionDescriptor {
  /// Look up a string parameter.
  pub fn param_str(&self, key: &str) -> Option<&str> {
    self.params.get(key).and_then(|v| v.as_str())
  }
}

/// A step in a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub id: String,
  pub node_type: NodeType,
  pub position: Position,
  pub data: NodeData,
  /// Transient: only the engine writes this.
  pub state: NodeState,
  /// Transient: value produced by the last execution, or an error marker.
  pub last_result: Option<serde_json::Value>,
}

impl Node {
  pub fn new(id: impl Into<String>, node_type: NodeType, position: Position, data: NodeData) -> Self {
    Self {
      id: id.into(),
      node_type,
      position,
      data,
      state: NodeState::Idle,
      last_result: None,
    }
  }

  pub fn label(&self) -> &str {
    &self.data.label
  }

  /// The action descriptor derived from the node data.
  ///
  /// Decision nodes dispatch on their named condition, falling back to
  /// `action`. All other nodes dispatch on `action`. Returns `None` when
  /// the node declares nothing to run.
  pub fn action(&self) -> Option<ActionDescriptor> {
    let name = match self.node_type {
      NodeType::Decision => self.data.condition.as_ref().or(self.data.action.as_ref()),
      _ => self.data.action.as_ref(),
    }?;

    let mut params = self.data.params.clone();
    let named = [
      ("recipient", &self.data.recipient),
      ("message", &self.data.message),
      ("condition", &self.data.condition),
    ];
    for (key, value) in named {
      if let Some(value) = value {
        params.insert(key.to_string(), serde_json::Value::String(value.clone()));
      }
    }

    Some(ActionDescriptor {
      name: name.clone(),
      params,
    })
  }

  /// Clear transient execution state.
  pub fn reset(&mut self) {
    self.state = NodeState::Idle;
    self.last_result = None;
  }
}
