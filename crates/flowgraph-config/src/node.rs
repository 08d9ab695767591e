use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of step a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
  /// Entry point of a flow. Exactly one per flow.
  Start,
  /// A processing action (notify, log, ...).
  Process,
  /// A binary decision with an affirmative and a negative branch.
  Decision,
  /// A data lookup.
  Data,
  /// Completion marker.
  End,
}

impl NodeType {
  /// Human readable name, used as the default node label.
  pub fn display_name(&self) -> &'static str {
    match self {
      NodeType::Start => "Start",
      NodeType::Process => "Process",
      NodeType::Decision => "Decision",
      NodeType::Data => "Data",
      NodeType::End => "End",
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      NodeType::Start => "start",
      NodeType::Process => "process",
      NodeType::Decision => "decision",
      NodeType::Data => "data",
      NodeType::End => "end",
    }
  }
}

impl fmt::Display for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Canvas position of a node. Cosmetic, but round-tripped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

impl Position {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// User-editable data attached to a node.
///
/// The well-known fields are typed; anything else the editor stores (for
/// example a `threshold` for a data lookup) lands in `params`. A key listed
/// in [`NodeData::FIELDS`] never belongs in `params`: it would be written
/// twice and the document would not load back.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
  #[serde(default)]
  pub label: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  /// Name of the action to dispatch, e.g. "log", "notify", "fetch".
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,

  /// Named condition evaluated by a decision node, e.g. "has_low_stock".
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recipient: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,

  /// Free-form parameters not covered by the fields above.
  #[serde(flatten)]
  pub params: serde_json::Map<String, serde_json::Value>,
}

impl NodeData {
  /// Keys serialized as typed fields.
  pub const FIELDS: [&'static str; 6] = ["label", "description", "action", "condition", "recipient", "message"];

  /// Default data for a freshly added node of the given type.
  pub fn for_type(node_type: NodeType) -> Self {
    Self {
      label: node_type.display_name().to_string(),
      ..Default::default()
    }
  }

  pub fn with_label(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      ..Default::default()
    }
  }

  pub fn action(mut self, action: impl Into<String>) -> Self {
    self.action = Some(action.into());
    self
  }

  pub fn condition(mut self, condition: impl Into<String>) -> Self {
    self.condition = Some(condition.into());
    self
  }

  pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
    self.recipient = Some(recipient.into());
    self
  }

  pub fn message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  /// Set a free-form parameter. Typed field names go to their field.
  pub fn param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    let key = key.into();
    if !self.set_field(&key, &value) {
      self.params.insert(key, value);
    }
    self
  }

  /// First `params` key that shadows a typed field, if any.
  pub fn reserved_param(&self) -> Option<&str> {
    self
      .params
      .keys()
      .map(String::as_str)
      .find(|key| Self::FIELDS.contains(key))
  }

  fn set_field(&mut self, key: &str, value: &serde_json::Value) -> bool {
    let text = match value {
      serde_json::Value::Null => None,
      serde_json::Value::String(s) => Some(s.clone()),
      other => Some(other.to_string()),
    };
    let slot = match key {
      "label" => {
        self.label = text.unwrap_or_default();
        return true;
      }
      "description" => &mut self.description,
      "action" => &mut self.action,
      "condition" => &mut self.condition,
      "recipient" => &mut self.recipient,
      "message" => &mut self.message,
      _ => return false,
    };
    *slot = text;
    true
  }
}

/// A node as it appears in a flow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: NodeType,
  #[serde(default)]
  pub position: Position,
  #[serde(default)]
  pub data: NodeData,
}
