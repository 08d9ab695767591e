use flowgraph_config::BranchTag;

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  /// Only meaningful on edges leaving a decision node.
  pub branch_tag: Option<BranchTag>,
  /// Cosmetic.
  pub label: Option<String>,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      branch_tag: None,
      label: None,
    }
  }

  pub fn references(&self, node_id: &str) -> bool {
    self.source == node_id || self.target == node_id
  }
}
