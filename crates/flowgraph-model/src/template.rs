//! Built-in flow templates.

use flowgraph_config::{BranchTag, NodeData, NodeType, Position};
use serde_json::json;

use crate::edge::Edge;
use crate::flow::Flow;
use crate::node::Node;

/// Starting points offered when creating a new flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowTemplate {
  /// Start -> log message -> End.
  Linear,
  /// Fetch inventory, branch on low stock, notify or log.
  LowStockAlert,
}

impl FlowTemplate {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "linear" => Some(FlowTemplate::Linear),
      "low-stock" | "low_stock" | "low-stock-alert" => Some(FlowTemplate::LowStockAlert),
      _ => None,
    }
  }

  pub(crate) fn apply(&self, flow: &mut Flow) {
    let (nodes, edges) = match self {
      FlowTemplate::Linear => linear(),
      FlowTemplate::LowStockAlert => low_stock_alert(),
    };
    for node in nodes {
      flow.nodes.insert(node.id.clone(), node);
    }
    flow.edges.extend(edges);
  }
}

fn at(row: f64, column: f64) -> Position {
  Position::new(column * 250.0, row * 120.0)
}

fn edge(id: &str, source: &str, target: &str) -> Edge {
  Edge::new(id, source, target)
}

fn branch(id: &str, source: &str, target: &str, tag: BranchTag) -> Edge {
  Edge {
    branch_tag: Some(tag),
    label: Some(tag.default_label().to_string()),
    ..Edge::new(id, source, target)
  }
}

fn linear() -> (Vec<Node>, Vec<Edge>) {
  let nodes = vec![
    Node::new("start", NodeType::Start, at(0.0, 0.0), NodeData::for_type(NodeType::Start)),
    Node::new(
      "log",
      NodeType::Process,
      at(1.0, 0.0),
      NodeData::with_label("Log message")
        .action("log")
        .message("Flow started"),
    ),
    Node::new("end", NodeType::End, at(2.0, 0.0), NodeData::for_type(NodeType::End)),
  ];
  let edges = vec![edge("e-start-log", "start", "log"), edge("e-log-end", "log", "end")];
  (nodes, edges)
}

fn low_stock_alert() -> (Vec<Node>, Vec<Edge>) {
  let nodes = vec![
    Node::new("start", NodeType::Start, at(0.0, 1.0), NodeData::for_type(NodeType::Start)),
    Node::new(
      "fetch",
      NodeType::Data,
      at(1.0, 1.0),
      NodeData::with_label("Fetch inventory")
        .action("fetch")
        .param("threshold", json!(10)),
    ),
    Node::new(
      "check",
      NodeType::Decision,
      at(2.0, 1.0),
      NodeData::with_label("Low stock?").condition("has_low_stock"),
    ),
    Node::new(
      "notify",
      NodeType::Process,
      at(3.0, 2.0),
      NodeData::with_label("Email purchasing")
        .action("notify")
        .recipient("purchasing@example.com")
        .message("{{ results.fetch.lowStockCount }} products are running low"),
    ),
    Node::new(
      "log",
      NodeType::Process,
      at(3.0, 0.0),
      NodeData::with_label("Log OK")
        .action("log")
        .message("Stock levels OK"),
    ),
    Node::new("end-alert", NodeType::End, at(4.0, 2.0), NodeData::for_type(NodeType::End)),
    Node::new("end-ok", NodeType::End, at(4.0, 0.0), NodeData::for_type(NodeType::End)),
  ];
  let edges = vec![
    edge("e-start-fetch", "start", "fetch"),
    edge("e-fetch-check", "fetch", "check"),
    branch("e-check-notify", "check", "notify", BranchTag::Affirmative),
    branch("e-check-log", "check", "log", BranchTag::Negative),
    edge("e-notify-end", "notify", "end-alert"),
    edge("e-log-end", "log", "end-ok"),
  ];
  (nodes, edges)
}
