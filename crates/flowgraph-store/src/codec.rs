use flowgraph_config::FlowDoc;
use flowgraph_model::Flow;

use crate::error::PersistenceError;

/// Encode a flow as its JSON document.
///
/// Refuses flows whose node data could not be decoded again.
pub fn serialize(flow: &Flow) -> Result<Vec<u8>, PersistenceError> {
  Ok(serde_json::to_vec_pretty(&flow.try_to_doc()?)?)
}

/// Decode a flow from its JSON document.
///
/// Execution state is not persisted; every node comes back `Idle`.
pub fn deserialize(bytes: &[u8]) -> Result<Flow, PersistenceError> {
  let doc: FlowDoc = serde_json::from_slice(bytes)?;
  Ok(Flow::from_doc(doc)?)
}
