use thiserror::Error;

/// Errors raised by flow mutations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("edge not found: {0}")]
  EdgeNotFound(String),

  #[error("edge {source_id} -> {target_id} references unknown node '{missing}'")]
  InvalidReference {
    source_id: String,
    target_id: String,
    missing: String,
  },

  #[error("invalid branch on edge from '{node_id}': {reason}")]
  InvalidBranch { node_id: String, reason: String },

  #[error("duplicate id: {0}")]
  DuplicateId(String),

  #[error("node '{node_id}' stores typed field '{key}' as a free-form param")]
  ReservedParam { node_id: String, key: String },
}

/// A violation of the structural invariants a flow must satisfy to run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
  #[error("no start node")]
  NoStartNode,

  #[error("multiple start nodes: {}", .node_ids.join(", "))]
  MultipleStartNodes { node_ids: Vec<String> },

  #[error("edge '{edge_id}' references unknown node '{missing}'")]
  DanglingEdge { edge_id: String, missing: String },

  #[error("decision node '{node_id}' is malformed: {reason}")]
  MalformedDecision { node_id: String, reason: String },

  #[error("edge '{edge_id}' carries a branch tag but its source '{node_id}' is not a decision node")]
  StrayBranchTag { edge_id: String, node_id: String },
}
