//! Flowgraph Config
//!
//! This crate contains the serializable flow document types for flowgraph.
//! These types describe a flow the way it is persisted or exported, before it
//! is loaded into the in-memory model used for editing and execution.
//!
//! A document looks like:
//!
//! ```json
//! {
//!   "name": "Low stock alert",
//!   "nodes": [
//!     { "id": "start", "type": "start", "position": { "x": 0, "y": 0 }, "data": { "label": "Start" } },
//!     { "id": "check", "type": "decision", "position": { "x": 0, "y": 120 },
//!       "data": { "label": "Low stock?", "condition": "has_low_stock" } }
//!   ],
//!   "edges": [
//!     { "id": "e1", "source": "start", "target": "check" }
//!   ],
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```

mod edge;
mod flow;
mod node;

pub use edge::{BranchTag, EdgeDef};
pub use flow::FlowDoc;
pub use node::{NodeData, NodeDef, NodeType, Position};
