use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
  pub run_id: String,
  pub flow: String,
  /// Every node that entered `Executing`, in completion order.
  pub executed_nodes: Vec<String>,
  /// Subset of `executed_nodes` that ended `Failed`.
  pub failed_nodes: Vec<String>,
  /// Number of warning entries appended to the log.
  pub warnings: usize,
  /// Whether cancellation stopped at least one node from being scheduled.
  pub cancelled: bool,
  pub duration: Duration,
}

impl RunSummary {
  pub fn succeeded(&self) -> bool {
    self.failed_nodes.is_empty() && !self.cancelled
  }
}
