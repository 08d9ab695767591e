//! Conversion between the in-memory [`Flow`] and its document form.

use std::collections::HashSet;

use flowgraph_config::{EdgeDef, FlowDoc, NodeData, NodeDef};

use crate::edge::Edge;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::node::Node;

impl Flow {
  /// Convert to the persisted document shape. Nodes are sorted by id.
  pub fn to_doc(&self) -> FlowDoc {
    let mut nodes: Vec<NodeDef> = self
      .nodes
      .values()
      .map(|node| NodeDef {
        id: node.id.clone(),
        node_type: node.node_type,
        position: node.position,
        data: node.data.clone(),
      })
      .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let edges = self
      .edges
      .iter()
      .map(|edge| EdgeDef {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        branch_tag: edge.branch_tag,
        label: edge.label.clone(),
      })
      .collect();

    FlowDoc {
      name: self.name.clone(),
      nodes,
      edges,
      timestamp: self.updated_at,
    }
  }

  /// Like [`Flow::to_doc`], but fails if a node's data would not load back.
  pub fn try_to_doc(&self) -> Result<FlowDoc, FlowError> {
    let doc = self.to_doc();
    for def in &doc.nodes {
      check_params(&def.id, &def.data)?;
    }
    Ok(doc)
  }

  /// Load a flow from its document form.
  ///
  /// Duplicate node or edge ids are rejected, as are params named after a
  /// typed node field. Structural invariants are not
  /// checked here; run [`Flow::validate`] before executing.
  pub fn from_doc(doc: FlowDoc) -> Result<Self, FlowError> {
    let mut flow = Flow::new(doc.name);

    for def in doc.nodes {
      if flow.nodes.contains_key(&def.id) {
        return Err(FlowError::DuplicateId(def.id));
      }
      check_params(&def.id, &def.data)?;
      let node = Node::new(def.id.clone(), def.node_type, def.position, def.data);
      flow.nodes.insert(def.id, node);
    }

    let mut edge_ids = HashSet::new();
    for def in doc.edges {
      if !edge_ids.insert(def.id.clone()) {
        return Err(FlowError::DuplicateId(def.id));
      }
      flow.edges.push(Edge {
        id: def.id,
        source: def.source,
        target: def.target,
        branch_tag: def.branch_tag,
        label: def.label,
      });
    }

    flow.updated_at = doc.timestamp;
    Ok(flow)
  }
}

pub(crate) fn check_params(node_id: &str, data: &NodeData) -> Result<(), FlowError> {
  match data.reserved_param() {
    Some(key) => Err(FlowError::ReservedParam {
      node_id: node_id.to_string(),
      key: key.to_string(),
    }),
    None => Ok(()),
  }
}
