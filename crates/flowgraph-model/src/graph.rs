use std::collections::HashMap;

use crate::edge::Edge;
use crate::node::Node;

/// Forward adjacency used by the engine to walk a flow.
#[derive(Debug, Clone)]
pub struct Graph {
  /// node_id -> outgoing edges, in flow edge order.
  outgoing: HashMap<String, Vec<Edge>>,
}

impl Graph {
  /// Build a graph from nodes and edges.
  ///
  /// Edges whose endpoints are missing are ignored; [`crate::validate`]
  /// reports them.
  pub fn new(nodes: &HashMap<String, Node>, edges: &[Edge]) -> Self {
    let mut outgoing: HashMap<String, Vec<Edge>> = HashMap::new();

    for node_id in nodes.keys() {
      outgoing.entry(node_id.clone()).or_default();
    }

    for edge in edges {
      if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
        continue;
      }
      outgoing
        .entry(edge.source.clone())
        .or_default()
        .push(edge.clone());
    }

    Self { outgoing }
  }

  /// Get the outgoing edges of a node.
  pub fn outgoing(&self, node_id: &str) -> &[Edge] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
