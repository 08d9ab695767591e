//! Execution events and observers.
//!
//! Events are emitted during a run so a rendering layer can show node state
//! and stream log entries as they happen.

use flowgraph_model::NodeState;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::log::LogEntry;
use crate::summary::RunSummary;

/// Events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowEvent {
  /// A run has started.
  RunStarted { run_id: String, flow: String },

  /// A node moved to a new execution state.
  NodeStateChanged {
    run_id: String,
    node_id: String,
    state: NodeState,
    result: Option<serde_json::Value>,
  },

  /// An entry was appended to the execution log.
  LogAppended { run_id: String, entry: LogEntry },

  /// Every reachable branch has terminated.
  RunCompleted { summary: RunSummary },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event - implementations decide what to
/// do with them (render, persist, ignore, ...).
pub trait FlowObserver: Send + Sync {
  fn notify(&self, event: FlowEvent);
}

/// An observer that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopObserver;

impl FlowObserver for NoopObserver {
  fn notify(&self, _event: FlowEvent) {}
}

/// An observer that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
  // Unbounded so a slow UI never stalls the run; volume is a handful of
  // events per node.
  sender: mpsc::UnboundedSender<FlowEvent>,
}

impl ChannelObserver {
  pub fn new(sender: mpsc::UnboundedSender<FlowEvent>) -> Self {
    Self { sender }
  }

  /// Create an observer together with the receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<FlowEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl FlowObserver for ChannelObserver {
  fn notify(&self, event: FlowEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl<T: FlowObserver + ?Sized> FlowObserver for std::sync::Arc<T> {
  fn notify(&self, event: FlowEvent) {
    (**self).notify(event)
  }
}
