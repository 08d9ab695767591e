//! Flowgraph Model
//!
//! This crate provides the in-memory representation of a flow: typed nodes,
//! directed edges, and the structural rules a flow must satisfy before it can
//! be executed.
//!
//! Key differences from `flowgraph-config`:
//! - Nodes are keyed by id and carry transient execution state
//! - Mutations go through `add_*`/`remove_*` which enforce local invariants
//! - [`validate`] enumerates every structural violation without failing
//! - [`Graph`] precomputes adjacency for traversal

mod doc;
mod edge;
mod error;
mod flow;
mod graph;
mod node;
mod template;
mod validate;

pub use edge::Edge;
pub use error::{FlowError, StructuralError};
pub use flow::Flow;
pub use graph::Graph;
pub use node::{ActionDescriptor, Node, NodeState};
pub use template::FlowTemplate;
pub use validate::validate;

pub use flowgraph_config::{BranchTag, NodeData, NodeType, Position};
