use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flowgraph_config::{BranchTag, NodeData, NodeType, Position};

use crate::doc::check_params;
use crate::edge::Edge;
use crate::error::{FlowError, StructuralError};
use crate::graph::Graph;
use crate::node::Node;
use crate::template::FlowTemplate;

/// A flow: a named graph of typed nodes joined by directed edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
  pub name: String,
  pub nodes: HashMap<String, Node>,
  pub edges: Vec<Edge>,
  pub updated_at: DateTime<Utc>,
}

impl Flow {
  /// Create an empty flow.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      nodes: HashMap::new(),
      edges: Vec::new(),
      updated_at: Utc::now(),
    }
  }

  /// Create a flow pre-populated from a built-in template.
  pub fn from_template(name: impl Into<String>, template: FlowTemplate) -> Self {
    let mut flow = Self::new(name);
    template.apply(&mut flow);
    flow
  }

  /// Add a node with a generated id. Missing data defaults per node type.
  pub fn add_node(&mut self, node_type: NodeType, position: Position, data: Option<NodeData>) -> Node {
    let id = format!("{}-{}", node_type, uuid::Uuid::new_v4());
    let node = Node::new(
      id.clone(),
      node_type,
      position,
      data.unwrap_or_else(|| NodeData::for_type(node_type)),
    );
    self.nodes.insert(id, node.clone());
    self.touch();
    node
  }

  /// Add a node with a caller-chosen id.
  pub fn add_node_with_id(
    &mut self,
    id: impl Into<String>,
    node_type: NodeType,
    position: Position,
    data: Option<NodeData>,
  ) -> Result<Node, FlowError> {
    let id = id.into();
    if self.nodes.contains_key(&id) {
      return Err(FlowError::DuplicateId(id));
    }
    let data = data.unwrap_or_else(|| NodeData::for_type(node_type));
    check_params(&id, &data)?;
    let node = Node::new(id.clone(), node_type, position, data);
    self.nodes.insert(id, node.clone());
    self.touch();
    Ok(node)
  }

  /// Remove a node and every edge referencing it.
  pub fn remove_node(&mut self, node_id: &str) -> Result<Node, FlowError> {
    let node = self
      .nodes
      .remove(node_id)
      .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))?;
    self.edges.retain(|edge| !edge.references(node_id));
    self.touch();
    Ok(node)
  }

  /// Connect two nodes with a generated edge id.
  ///
  /// Edges leaving a decision node must carry a branch tag not already used
  /// by another edge from the same node; edges leaving any other node must
  /// not carry one.
  pub fn add_edge(
    &mut self,
    source: &str,
    target: &str,
    branch_tag: Option<BranchTag>,
  ) -> Result<Edge, FlowError> {
    let id = format!("edge-{}", uuid::Uuid::new_v4());
    self.add_edge_with_id(id, source, target, branch_tag)
  }

  /// Connect two nodes with a caller-chosen edge id.
  pub fn add_edge_with_id(
    &mut self,
    id: impl Into<String>,
    source: &str,
    target: &str,
    branch_tag: Option<BranchTag>,
  ) -> Result<Edge, FlowError> {
    let id = id.into();
    if self.edges.iter().any(|e| e.id == id) {
      return Err(FlowError::DuplicateId(id));
    }

    let invalid_reference = |missing: &str| FlowError::InvalidReference {
      source_id: source.to_string(),
      target_id: target.to_string(),
      missing: missing.to_string(),
    };
    let source_node = self.nodes.get(source).ok_or_else(|| invalid_reference(source))?;
    if !self.nodes.contains_key(target) {
      return Err(invalid_reference(target));
    }

    let label = match (source_node.node_type, branch_tag) {
      (NodeType::Decision, None) => {
        return Err(FlowError::InvalidBranch {
          node_id: source.to_string(),
          reason: "edges leaving a decision node need a branch tag".to_string(),
        });
      }
      (NodeType::Decision, Some(tag)) => {
        let taken = self
          .edges
          .iter()
          .any(|e| e.source == source && e.branch_tag == Some(tag));
        if taken {
          return Err(FlowError::InvalidBranch {
            node_id: source.to_string(),
            reason: format!("{:?} branch already connected", tag).to_lowercase(),
          });
        }
        Some(tag.default_label().to_string())
      }
      (_, Some(_)) => {
        return Err(FlowError::InvalidBranch {
          node_id: source.to_string(),
          reason: "only decision nodes have tagged branches".to_string(),
        });
      }
      (_, None) => None,
    };

    let edge = Edge {
      id,
      source: source.to_string(),
      target: target.to_string(),
      branch_tag,
      label,
    };
    self.edges.push(edge.clone());
    self.touch();
    Ok(edge)
  }

  /// Remove an edge by id.
  pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, FlowError> {
    let index = self
      .edges
      .iter()
      .position(|e| e.id == edge_id)
      .ok_or_else(|| FlowError::EdgeNotFound(edge_id.to_string()))?;
    let edge = self.edges.remove(index);
    self.touch();
    Ok(edge)
  }

  /// Remove every node and edge.
  pub fn clear(&mut self) {
    self.nodes.clear();
    self.edges.clear();
    self.touch();
  }

  /// Enumerate every structural violation.
  pub fn validate(&self) -> Vec<StructuralError> {
    crate::validate::validate(self)
  }

  /// Build the adjacency structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.get(node_id)
  }

  pub fn get_node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
    self.nodes.get_mut(node_id)
  }

  /// Ids of all start nodes, sorted.
  pub fn start_nodes(&self) -> Vec<String> {
    let mut ids: Vec<String> = self
      .nodes
      .values()
      .filter(|n| n.node_type == NodeType::Start)
      .map(|n| n.id.clone())
      .collect();
    ids.sort();
    ids
  }

  /// Outgoing edges of a node, in insertion order.
  pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &Edge> + '_ {
    let node_id = node_id.to_string();
    self.edges.iter().filter(move |e| e.source == node_id)
  }

  /// Reset transient execution state on every node.
  pub fn reset_execution_state(&mut self) {
    for node in self.nodes.values_mut() {
      node.reset();
    }
  }

  fn touch(&mut self) {
    self.updated_at = Utc::now();
  }
}
