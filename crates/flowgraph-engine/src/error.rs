//! Error types for flow execution.

use flowgraph_model::StructuralError;
use thiserror::Error;

use crate::dispatcher::{ActionKey, HandlerKind};

/// Failure of a single action handler. Contained to the node and its branch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
  /// The handler ran and reported failure.
  #[error("{message}")]
  Failed { message: String },

  /// A node parameter is missing or has the wrong shape.
  #[error("invalid parameter '{param}': {message}")]
  InvalidParams { param: String, message: String },

  /// A decision node names a condition the handler does not know.
  #[error("unknown condition '{0}'")]
  UnknownCondition(String),

  /// No handler is registered and the engine runs with strict handlers.
  #[error("no handler registered for {0}")]
  MissingHandler(ActionKey),
}

impl ActionError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidParams {
      param: param.into(),
      message: message.into(),
    }
  }
}

/// Rejected handler registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
  /// Decision nodes only accept condition handlers, and condition handlers
  /// only serve decision nodes.
  #[error("{kind:?} handler cannot serve {key}")]
  KindMismatch { key: ActionKey, kind: HandlerKind },

  #[error("a handler is already registered for {0}")]
  DuplicateHandler(ActionKey),
}

/// Errors that abort a whole run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
  /// The flow failed validation; no node was executed.
  #[error("flow is structurally invalid: {}", join_errors(.errors))]
  Structural { errors: Vec<StructuralError> },

  /// A run for this flow is already in flight.
  #[error("flow '{flow}' is already running")]
  AlreadyRunning { flow: String },

  /// The run service has been shut down.
  #[error("run service is shut down")]
  ShutDown,
}

fn join_errors(errors: &[StructuralError]) -> String {
  errors
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}
