//! Flow execution engine.
//!
//! The `FlowEngine` walks a flow from its start node. Each node is executed
//! through the [`ActionDispatcher`], then the engine follows either the
//! matching branch (decision nodes) or every outgoing edge (fan-out).
//! Failures are contained to the branch they happen on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use flowgraph_model::{BranchTag, Flow, Graph, Node, NodeState, NodeType, StructuralError};
use futures::future::{BoxFuture, join_all};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{EngineConfig, FanOutMode};
use crate::context::{ActionContext, ExternalState};
use crate::dispatcher::{ActionDispatcher, Dispatched};
use crate::error::{ActionError, EngineError};
use crate::events::{FlowEvent, FlowObserver, NoopObserver};
use crate::log::{LogEntry, LogSink, LogStatus};
use crate::summary::RunSummary;

/// The flow execution engine.
///
/// Generic over `N: FlowObserver` to allow different notification strategies.
/// Use `FlowEngine::new()` for an engine with no-op notifications, or
/// `FlowEngine::with_observer()` to provide a custom observer.
pub struct FlowEngine<N: FlowObserver = NoopObserver> {
  dispatcher: Arc<ActionDispatcher>,
  config: EngineConfig,
  observer: N,
}

impl FlowEngine<NoopObserver> {
  /// Create an engine whose events are discarded.
  pub fn new(dispatcher: Arc<ActionDispatcher>, config: EngineConfig) -> Self {
    Self::with_observer(dispatcher, config, NoopObserver)
  }
}

impl<N: FlowObserver> FlowEngine<N> {
  /// Create an engine with a custom observer.
  pub fn with_observer(dispatcher: Arc<ActionDispatcher>, config: EngineConfig, observer: N) -> Self {
    Self {
      dispatcher,
      config,
      observer,
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn dispatcher(&self) -> &ActionDispatcher {
    &self.dispatcher
  }

  /// Execute a flow.
  ///
  /// Resets every node to `Idle`, validates the flow, then traverses it from
  /// the start node. Only a structural error aborts the run; per-node
  /// failures are reported in the returned [`RunSummary`]. On return the
  /// flow's nodes carry their final state and last result.
  #[instrument(
    name = "flow_run",
    skip(self, flow, log, state, cancel),
    fields(flow = %flow.name)
  )]
  pub async fn run(
    &self,
    flow: &mut Flow,
    log: &dyn LogSink,
    state: ExternalState,
    cancel: CancellationToken,
  ) -> Result<RunSummary, EngineError> {
    flow.reset_execution_state();

    let errors = flow.validate();
    if !errors.is_empty() {
      warn!(errors = errors.len(), "flow_invalid");
      return Err(EngineError::Structural { errors });
    }
    let start_id = flow
      .start_nodes()
      .into_iter()
      .next()
      .ok_or_else(|| EngineError::Structural {
        errors: vec![StructuralError::NoStartNode],
      })?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();

    info!(run_id = %run_id, start = %start_id, "run_started");
    self.observer.notify(FlowEvent::RunStarted {
      run_id: run_id.clone(),
      flow: flow.name.clone(),
    });

    let run = RunState::new(&run_id, flow, log, state, cancel);
    self.visit(&run, start_id, None).await;
    let record = run.finish();

    for (node_id, (state, result)) in record.outcomes {
      if let Some(node) = flow.get_node_mut(&node_id) {
        node.state = state;
        node.last_result = result;
      }
    }

    let summary = RunSummary {
      run_id: run_id.clone(),
      flow: flow.name.clone(),
      executed_nodes: record.executed,
      failed_nodes: record.failed,
      warnings: record.warnings,
      cancelled: record.cancelled,
      duration: started.elapsed(),
    };

    info!(
      run_id = %run_id,
      executed = summary.executed_nodes.len(),
      failed = summary.failed_nodes.len(),
      warnings = summary.warnings,
      cancelled = summary.cancelled,
      duration_ms = summary.duration.as_millis() as u64,
      "run_completed"
    );
    self.observer.notify(FlowEvent::RunCompleted {
      summary: summary.clone(),
    });

    Ok(summary)
  }

  /// Execute `node_id` and then the subgraph it leads to.
  fn visit<'a>(
    &'a self,
    run: &'a RunState<'a>,
    node_id: String,
    upstream: Option<serde_json::Value>,
  ) -> BoxFuture<'a, ()> {
    Box::pin(async move {
      let Some(node) = self.enter(run, &node_id) else {
        return;
      };

      let outcome = self.execute(run, node, upstream).await;
      let Some(result) = outcome else {
        return;
      };

      let mut next = self.next_targets(run, node, &result);
      match next.len() {
        0 => {}
        1 => {
          let target = next.remove(0);
          self.visit(run, target, Some(result)).await
        }
        _ => match self.config.fan_out {
          FanOutMode::Concurrent => {
            let branches = next
              .into_iter()
              .map(|target| self.visit(run, target, Some(result.clone())));
            join_all(branches).await;
          }
          FanOutMode::Sequential => {
            for target in next {
              self.visit(run, target, Some(result.clone())).await;
            }
          }
        },
      }
    })
  }

  /// Node-entry checks. Returns the node if it should execute.
  fn enter<'a>(&self, run: &RunState<'a>, node_id: &str) -> Option<&'a Node> {
    if run.cancel.is_cancelled() {
      run.cancelled.store(true, Ordering::SeqCst);
      debug!(run_id = %run.run_id, node_id = %node_id, "node_skipped_cancelled");
      return None;
    }

    let node = match run.flow.get_node(node_id) {
      Some(node) => node,
      None => {
        warn!(run_id = %run.run_id, node_id = %node_id, "node_missing");
        return None;
      }
    };

    if !run.claim(node_id) {
      self.warn(run, node, "already executed in this run; branch halted");
      return None;
    }

    let started = run.started.fetch_add(1, Ordering::SeqCst);
    if let Some(max) = self.config.max_nodes_per_run
      && started >= max
    {
      let reason = format!("node limit of {} reached; branch halted", max);
      self.warn(run, node, &reason);
      return None;
    }

    Some(node)
  }

  /// Run the node's action and record the outcome. Returns the result if the
  /// node executed successfully.
  async fn execute(
    &self,
    run: &RunState<'_>,
    node: &Node,
    upstream: Option<serde_json::Value>,
  ) -> Option<serde_json::Value> {
    self.set_state(run, node, NodeState::Executing, None);
    info!(run_id = %run.run_id, node_id = %node.id, node_type = %node.node_type, "node_started");

    let mut ctx = ActionContext::new(run.run_id.clone(), run.state.clone());
    ctx.upstream = upstream;
    ctx.results = run.results_snapshot();

    let outcome = match self.dispatcher.dispatch(node, &ctx).await {
      Ok(Dispatched::Completed(value)) => Ok(value),
      Ok(Dispatched::NoAction) => Ok(serde_json::Value::Null),
      Ok(Dispatched::Missing(key)) if self.config.strict_handlers => Err(ActionError::MissingHandler(key)),
      Ok(Dispatched::Missing(key)) => {
        self.warn(run, node, &format!("no handler registered for {}; treated as no-op", key));
        Ok(serde_json::Value::Null)
      }
      Err(e) => Err(e),
    };

    match outcome {
      Ok(result) => {
        run.record(node, NodeState::Executed, Some(result.clone()));
        info!(run_id = %run.run_id, node_id = %node.id, result = %result, "node_completed");
        self.append(
          run,
          LogEntry::new(&node.id, node.node_type, node.label(), LogStatus::Completed).with_result(result.clone()),
        );
        self.set_state(run, node, NodeState::Executed, Some(result.clone()));
        Some(result)
      }
      Err(e) => {
        let marker = serde_json::json!({ "error": e.to_string() });
        run.record(node, NodeState::Failed, Some(marker.clone()));
        warn!(run_id = %run.run_id, node_id = %node.id, error = %e, "node_failed");
        self.append(
          run,
          LogEntry::new(&node.id, node.node_type, node.label(), LogStatus::Failed)
            .with_result(marker.clone())
            .with_message(e.to_string()),
        );
        self.set_state(run, node, NodeState::Failed, Some(marker));
        None
      }
    }
  }

  /// Nodes to visit after `node` produced `result`.
  fn next_targets(&self, run: &RunState<'_>, node: &Node, result: &serde_json::Value) -> Vec<String> {
    let outgoing = run.graph.outgoing(&node.id);
    if node.node_type != NodeType::Decision {
      return outgoing.iter().map(|e| e.target.clone()).collect();
    }

    let Some(value) = result.as_bool() else {
      self.warn(
        run,
        node,
        &format!("decision result {} is not a boolean; branch halted", result),
      );
      return Vec::new();
    };

    let tag = BranchTag::from_bool(value);
    match outgoing.iter().find(|e| e.branch_tag == Some(tag)) {
      Some(edge) => vec![edge.target.clone()],
      None => {
        self.warn(
          run,
          node,
          &format!("no '{}' branch to follow; branch halted", tag.default_label()),
        );
        Vec::new()
      }
    }
  }

  fn set_state(&self, run: &RunState<'_>, node: &Node, state: NodeState, result: Option<serde_json::Value>) {
    self.observer.notify(FlowEvent::NodeStateChanged {
      run_id: run.run_id.clone(),
      node_id: node.id.clone(),
      state,
      result,
    });
  }

  fn warn(&self, run: &RunState<'_>, node: &Node, message: &str) {
    run.warnings.fetch_add(1, Ordering::SeqCst);
    warn!(run_id = %run.run_id, node_id = %node.id, reason = %message, "branch_halted");
    self.append(
      run,
      LogEntry::new(&node.id, node.node_type, node.label(), LogStatus::Warning).with_message(message),
    );
  }

  fn append(&self, run: &RunState<'_>, entry: LogEntry) {
    run.log.append(entry.clone());
    self.observer.notify(FlowEvent::LogAppended {
      run_id: run.run_id.clone(),
      entry,
    });
  }
}

/// Mutable bookkeeping for one run, shared by every branch.
struct RunState<'a> {
  run_id: String,
  flow: &'a Flow,
  graph: Graph,
  log: &'a dyn LogSink,
  state: ExternalState,
  cancel: CancellationToken,
  visited: Mutex<HashSet<String>>,
  progress: Mutex<Progress>,
  started: AtomicUsize,
  warnings: AtomicUsize,
  cancelled: AtomicBool,
}

#[derive(Default)]
struct Progress {
  outcomes: HashMap<String, (NodeState, Option<serde_json::Value>)>,
  results: serde_json::Map<String, serde_json::Value>,
  executed: Vec<String>,
  failed: Vec<String>,
}

/// What a finished run hands back to the engine.
struct RunRecord {
  outcomes: HashMap<String, (NodeState, Option<serde_json::Value>)>,
  executed: Vec<String>,
  failed: Vec<String>,
  warnings: usize,
  cancelled: bool,
}

impl<'a> RunState<'a> {
  fn new(
    run_id: &str,
    flow: &'a Flow,
    log: &'a dyn LogSink,
    state: ExternalState,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      run_id: run_id.to_string(),
      flow,
      graph: flow.graph(),
      log,
      state,
      cancel,
      visited: Mutex::new(HashSet::new()),
      progress: Mutex::new(Progress::default()),
      started: AtomicUsize::new(0),
      warnings: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
    }
  }

  /// Mark a node as visited. False if it already was.
  fn claim(&self, node_id: &str) -> bool {
    self
      .visited
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(node_id.to_string())
  }

  fn results_snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
    self
      .progress
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .results
      .clone()
  }

  fn record(&self, node: &Node, state: NodeState, result: Option<serde_json::Value>) {
    let mut progress = self.progress.lock().unwrap_or_else(|e| e.into_inner());
    progress.executed.push(node.id.clone());
    match state {
      NodeState::Failed => progress.failed.push(node.id.clone()),
      _ => {
        if let Some(value) = &result {
          progress.results.insert(node.id.clone(), value.clone());
        }
      }
    }
    progress.outcomes.insert(node.id.clone(), (state, result));
  }

  fn finish(self) -> RunRecord {
    let progress = self.progress.into_inner().unwrap_or_else(|e| e.into_inner());
    RunRecord {
      outcomes: progress.outcomes,
      executed: progress.executed,
      failed: progress.failed,
      warnings: self.warnings.into_inner(),
      cancelled: self.cancelled.into_inner(),
    }
  }
}
