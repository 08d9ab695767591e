use flowgraph_model::FlowError;
use thiserror::Error;

/// Error raised by a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("backend error: {0}")]
  Backend(String),
}

/// Error raised while saving or loading a flow.
#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("store error: {0}")]
  Store(#[from] StoreError),

  #[error("failed to encode or decode flow document: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("invalid flow document: {0}")]
  InvalidDocument(#[from] FlowError),
}
