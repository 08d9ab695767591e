//! Structural validation.
//!
//! Validation never fails: it returns every violation so the caller can
//! decide whether to block execution.

use flowgraph_config::{BranchTag, NodeType};

use crate::error::StructuralError;
use crate::flow::Flow;

/// Enumerate every structural invariant violation in a flow.
pub fn validate(flow: &Flow) -> Vec<StructuralError> {
  let mut errors = Vec::new();

  let starts = flow.start_nodes();
  match starts.len() {
    0 => errors.push(StructuralError::NoStartNode),
    1 => {}
    _ => errors.push(StructuralError::MultipleStartNodes { node_ids: starts }),
  }

  for edge in &flow.edges {
    for endpoint in [&edge.source, &edge.target] {
      if !flow.nodes.contains_key(endpoint) {
        errors.push(StructuralError::DanglingEdge {
          edge_id: edge.id.clone(),
          missing: endpoint.clone(),
        });
      }
    }
  }

  for edge in &flow.edges {
    if edge.branch_tag.is_some()
      && let Some(source) = flow.nodes.get(&edge.source)
      && source.node_type != NodeType::Decision
    {
      errors.push(StructuralError::StrayBranchTag {
        edge_id: edge.id.clone(),
        node_id: source.id.clone(),
      });
    }
  }

  let mut decisions: Vec<&str> = flow
    .nodes
    .values()
    .filter(|n| n.node_type == NodeType::Decision)
    .map(|n| n.id.as_str())
    .collect();
  decisions.sort();

  for node_id in decisions {
    if let Some(reason) = decision_problem(flow, node_id) {
      errors.push(StructuralError::MalformedDecision {
        node_id: node_id.to_string(),
        reason,
      });
    }
  }

  errors
}

fn decision_problem(flow: &Flow, node_id: &str) -> Option<String> {
  let tags: Vec<Option<BranchTag>> = flow.outgoing(node_id).map(|e| e.branch_tag).collect();

  if tags.len() != 2 {
    return Some(format!(
      "expected exactly two outgoing edges, found {}",
      tags.len()
    ));
  }
  if !tags.contains(&Some(BranchTag::Affirmative)) {
    return Some("missing affirmative branch".to_string());
  }
  if !tags.contains(&Some(BranchTag::Negative)) {
    return Some("missing negative branch".to_string());
  }
  None
}
