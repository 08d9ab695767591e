use serde::{Deserialize, Serialize};

/// How the outgoing edges of a non-decision node are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutMode {
  /// Branches are polled concurrently within the run.
  #[default]
  Concurrent,
  /// Branches run one after another, in edge order.
  Sequential,
}

/// Configuration for the flow engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub fan_out: FanOutMode,

  /// Fail nodes whose action has no registered handler instead of treating
  /// them as a no-op success.
  pub strict_handlers: bool,

  /// Stop scheduling new nodes once this many have executed in one run.
  pub max_nodes_per_run: Option<usize>,
}
