use serde::{Deserialize, Serialize};

/// Marker distinguishing the two outgoing edges of a decision node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchTag {
  /// Taken when the condition evaluates to `true`. Rendered as "Yes".
  #[serde(alias = "yes", alias = "true")]
  Affirmative,
  /// Taken when the condition evaluates to `false`. Rendered as "No".
  #[serde(alias = "no", alias = "false")]
  Negative,
}

impl BranchTag {
  pub fn from_bool(value: bool) -> Self {
    if value {
      BranchTag::Affirmative
    } else {
      BranchTag::Negative
    }
  }

  /// The label the editor shows for an edge carrying this tag.
  pub fn default_label(&self) -> &'static str {
    match self {
      BranchTag::Affirmative => "Yes",
      BranchTag::Negative => "No",
    }
  }
}

/// An edge as it appears in a flow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDef {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub branch_tag: Option<BranchTag>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
}
