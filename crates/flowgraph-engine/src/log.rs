//! Execution log.
//!
//! An append-only record of per-node execution events. Appends from
//! concurrently running branches are serialized by a single lock, and every
//! appended entry is also broadcast to subscribers in the same order.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use flowgraph_model::NodeType;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Outcome recorded by a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
  Executing,
  Completed,
  Failed,
  /// Execution continued but something was silently skipped (missing
  /// handler, missing decision branch, revisited node, ...).
  Warning,
}

/// One execution event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
  pub node_id: String,
  pub node_type: NodeType,
  pub label: String,
  pub timestamp: DateTime<Utc>,
  pub status: LogStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl LogEntry {
  pub fn new(node_id: impl Into<String>, node_type: NodeType, label: impl Into<String>, status: LogStatus) -> Self {
    Self {
      node_id: node_id.into(),
      node_type,
      label: label.into(),
      timestamp: Utc::now(),
      status,
      result: None,
      message: None,
    }
  }

  pub fn with_result(mut self, result: serde_json::Value) -> Self {
    self.result = Some(result);
    self
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}

/// Destination for log entries during a run.
pub trait LogSink: Send + Sync {
  fn append(&self, entry: LogEntry);
}

/// In-memory execution log with streaming subscribers.
pub struct ExecutionLog {
  entries: Mutex<Vec<LogEntry>>,
  sender: broadcast::Sender<LogEntry>,
}

impl ExecutionLog {
  pub fn new() -> Self {
    Self::with_stream_capacity(256)
  }

  /// Create a log whose subscribers may lag up to `capacity` entries before
  /// they start missing some.
  pub fn with_stream_capacity(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    Self {
      entries: Mutex::new(Vec::new()),
      sender,
    }
  }

  /// Receive entries as they are appended.
  pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
    self.sender.subscribe()
  }

  /// Snapshot of all entries so far.
  pub fn entries(&self) -> Vec<LogEntry> {
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Entries with the given status.
  pub fn with_status(&self, status: LogStatus) -> Vec<LogEntry> {
    self
      .entries()
      .into_iter()
      .filter(|e| e.status == status)
      .collect()
  }

  pub fn clear(&self) {
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clear();
  }
}

impl Default for ExecutionLog {
  fn default() -> Self {
    Self::new()
  }
}

impl LogSink for ExecutionLog {
  fn append(&self, entry: LogEntry) {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    // Broadcast under the lock so stream order matches storage order.
    // No subscribers is fine.
    let _ = self.sender.send(entry.clone());
    entries.push(entry);
  }
}
