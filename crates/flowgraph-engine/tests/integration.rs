//! Integration tests for flowgraph-engine using small in-process handlers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowgraph_engine::handlers::{
  ConditionHandler, DataFetchHandler, LogHandler, MessageSink, Notifier, NotifyHandler,
};
use flowgraph_engine::{
  ActionContext, ActionDispatcher, ActionError, ActionHandler, ChannelObserver, EngineConfig, EngineError,
  ExecutionLog, ExternalState, FanOutMode, FlowEngine, FlowEvent, HandlerKind, LogStatus, RunService,
};
use flowgraph_model::{BranchTag, Flow, FlowTemplate, Node, NodeData, NodeState, NodeType, Position, StructuralError};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Records every node it runs for and returns a fixed value.
struct Recording {
  kind: HandlerKind,
  value: serde_json::Value,
  calls: Arc<Mutex<Vec<String>>>,
}

impl Recording {
  fn new(kind: HandlerKind, value: serde_json::Value) -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(Self {
      kind,
      value,
      calls: calls.clone(),
    });
    (handler, calls)
  }
}

#[async_trait]
impl ActionHandler for Recording {
  fn kind(&self) -> HandlerKind {
    self.kind
  }

  async fn execute(&self, node: &Node, _ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    self.calls.lock().unwrap().push(node.id.clone());
    Ok(self.value.clone())
  }
}

/// Always fails.
struct Failing;

#[async_trait]
impl ActionHandler for Failing {
  fn kind(&self) -> HandlerKind {
    HandlerKind::Custom
  }

  async fn execute(&self, _node: &Node, _ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    Err(ActionError::failed("boom"))
  }
}

/// Trips a cancellation token when it runs.
struct CancelOnRun(CancellationToken);

#[async_trait]
impl ActionHandler for CancelOnRun {
  fn kind(&self) -> HandlerKind {
    HandlerKind::Custom
  }

  async fn execute(&self, _node: &Node, _ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    self.0.cancel();
    Ok(json!(null))
  }
}

/// Blocks until released.
struct Gate(Arc<tokio::sync::Notify>);

#[async_trait]
impl ActionHandler for Gate {
  fn kind(&self) -> HandlerKind {
    HandlerKind::Custom
  }

  async fn execute(&self, _node: &Node, _ctx: &ActionContext) -> Result<serde_json::Value, ActionError> {
    self.0.notified().await;
    Ok(json!(null))
  }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<(String, String)>>);

#[async_trait]
impl Notifier for Outbox {
  async fn send(&self, recipient: &str, _subject: &str, body: &str) -> Result<(), ActionError> {
    self
      .0
      .lock()
      .unwrap()
      .push((recipient.to_string(), body.to_string()));
    Ok(())
  }
}

#[derive(Default)]
struct Messages(Mutex<Vec<String>>);

impl MessageSink for Messages {
  fn write(&self, _node_id: &str, message: &str) {
    self.0.lock().unwrap().push(message.to_string());
  }
}

/// Add a node whose label is its id. `action` is the condition for decisions.
fn add(flow: &mut Flow, id: &str, node_type: NodeType, action: Option<&str>) {
  let mut data = NodeData::with_label(id);
  match node_type {
    NodeType::Decision => data.condition = action.map(str::to_string),
    _ => data.action = action.map(str::to_string),
  }
  flow
    .add_node_with_id(id, node_type, Position::default(), Some(data))
    .unwrap();
}

fn connect(flow: &mut Flow, source: &str, target: &str) {
  flow.add_edge(source, target, None).unwrap();
}

fn branch(flow: &mut Flow, source: &str, target: &str, tag: BranchTag) {
  flow.add_edge(source, target, Some(tag)).unwrap();
}

fn engine(dispatcher: ActionDispatcher) -> FlowEngine {
  FlowEngine::new(Arc::new(dispatcher), EngineConfig::default())
}

fn state_of(flow: &Flow, id: &str) -> NodeState {
  flow.get_node(id).unwrap().state
}

fn inventory(quantities: &[u64]) -> ExternalState {
  let items: Vec<serde_json::Value> = quantities
    .iter()
    .enumerate()
    .map(|(i, q)| json!({ "sku": format!("sku-{}", i), "quantity": q }))
    .collect();
  ExternalState::new(json!({ "inventory": items }))
}

fn low_stock_dispatcher(outbox: Arc<Outbox>, messages: Arc<Messages>) -> ActionDispatcher {
  let mut dispatcher = ActionDispatcher::new();
  dispatcher
    .register(NodeType::Data, "fetch", Arc::new(DataFetchHandler::default()))
    .unwrap();
  dispatcher
    .register(NodeType::Process, "notify", Arc::new(NotifyHandler::new(outbox)))
    .unwrap();
  dispatcher
    .register(NodeType::Process, "log", Arc::new(LogHandler::new(messages)))
    .unwrap();
  Arc::new(ConditionHandler::with_builtins())
    .register_all(&mut dispatcher)
    .unwrap();
  dispatcher
}

#[tokio::test]
async fn test_linear_flow() {
  let mut flow = Flow::new("linear");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "hello", NodeType::Process, Some("log"));
  add(&mut flow, "end", NodeType::End, None);
  connect(&mut flow, "start", "hello");
  connect(&mut flow, "hello", "end");
  flow.get_node_mut("hello").unwrap().data.message = Some("hello".to_string());

  let messages = Arc::new(Messages::default());
  let mut dispatcher = ActionDispatcher::new();
  dispatcher
    .register(NodeType::Process, "log", Arc::new(LogHandler::new(messages.clone())))
    .unwrap();
  let log = ExecutionLog::new();

  let summary = engine(dispatcher)
    .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes, vec!["start", "hello", "end"]);
  assert!(summary.failed_nodes.is_empty());
  assert!(summary.succeeded());
  assert_eq!(log.with_status(LogStatus::Completed).len(), 3);
  assert_eq!(log.len(), 3);
  assert_eq!(*messages.0.lock().unwrap(), vec!["hello".to_string()]);
  for id in ["start", "hello", "end"] {
    assert_eq!(state_of(&flow, id), NodeState::Executed);
  }
}

#[tokio::test]
async fn test_low_stock_takes_affirmative_branch() {
  let outbox = Arc::new(Outbox::default());
  let messages = Arc::new(Messages::default());
  let engine = engine(low_stock_dispatcher(outbox.clone(), messages.clone()));
  let mut flow = Flow::from_template("alerts", FlowTemplate::LowStockAlert);
  let log = ExecutionLog::new();

  let summary = engine
    .run(&mut flow, &log, inventory(&[2, 50, 4, 8]), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(
    summary.executed_nodes,
    vec!["start", "fetch", "check", "notify", "end-alert"]
  );
  assert_eq!(state_of(&flow, "log"), NodeState::Idle);
  assert_eq!(state_of(&flow, "end-ok"), NodeState::Idle);
  assert_eq!(flow.get_node("fetch").unwrap().last_result.as_ref().unwrap()["lowStockCount"], 3);
  assert_eq!(flow.get_node("check").unwrap().last_result, Some(json!(true)));

  let sent = outbox.0.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, "purchasing@example.com");
  assert_eq!(sent[0].1, "3 products are running low");
  assert!(messages.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_low_stock_takes_negative_branch() {
  let outbox = Arc::new(Outbox::default());
  let messages = Arc::new(Messages::default());
  let engine = engine(low_stock_dispatcher(outbox.clone(), messages.clone()));
  let mut flow = Flow::from_template("alerts", FlowTemplate::LowStockAlert);

  let summary = engine
    .run(&mut flow, &ExecutionLog::new(), inventory(&[20, 50]), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes, vec!["start", "fetch", "check", "log", "end-ok"]);
  assert_eq!(state_of(&flow, "notify"), NodeState::Idle);
  assert!(outbox.0.lock().unwrap().is_empty());
  assert_eq!(*messages.0.lock().unwrap(), vec!["Stock levels OK".to_string()]);
}

#[tokio::test]
async fn test_decision_follows_result_every_time() {
  for (value, taken, skipped) in [(true, "yes", "no"), (false, "no", "yes")] {
    let mut flow = Flow::new("decide");
    add(&mut flow, "start", NodeType::Start, None);
    add(&mut flow, "check", NodeType::Decision, Some("fixed"));
    add(&mut flow, "yes", NodeType::Process, Some("record"));
    add(&mut flow, "no", NodeType::Process, Some("record"));
    connect(&mut flow, "start", "check");
    branch(&mut flow, "check", "yes", BranchTag::Affirmative);
    branch(&mut flow, "check", "no", BranchTag::Negative);

    let (condition, _) = Recording::new(HandlerKind::Condition, json!(value));
    let (record, calls) = Recording::new(HandlerKind::Custom, json!(null));
    let mut dispatcher = ActionDispatcher::new();
    dispatcher.register(NodeType::Decision, "fixed", condition).unwrap();
    dispatcher.register(NodeType::Process, "record", record).unwrap();
    let engine = engine(dispatcher);

    for _ in 0..5 {
      engine
        .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), CancellationToken::new())
        .await
        .unwrap();
      assert_eq!(state_of(&flow, taken), NodeState::Executed);
      assert_eq!(state_of(&flow, skipped), NodeState::Idle);
    }
    assert!(calls.lock().unwrap().iter().all(|id| id == taken));
  }
}

#[tokio::test]
async fn test_validation_blocks_execution() {
  let mut flow = Flow::new("two-starts");
  add(&mut flow, "start-a", NodeType::Start, Some("record"));
  add(&mut flow, "start-b", NodeType::Start, Some("record"));
  add(&mut flow, "end", NodeType::End, None);
  connect(&mut flow, "start-a", "end");

  let (record, calls) = Recording::new(HandlerKind::Custom, json!(null));
  let mut dispatcher = ActionDispatcher::new();
  dispatcher.register(NodeType::Start, "record", record).unwrap();
  let log = ExecutionLog::new();

  let err = engine(dispatcher)
    .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    EngineError::Structural { errors } => {
      let multiple = errors
        .iter()
        .find(|e| matches!(e, StructuralError::MultipleStartNodes { .. }))
        .unwrap();
      assert!(multiple.to_string().contains("multiple start nodes"));
    }
    other => panic!("expected structural error, got {:?}", other),
  }
  assert!(calls.lock().unwrap().is_empty());
  assert!(log.is_empty());
  assert!(flow.nodes.values().all(|n| n.state == NodeState::Idle));
}

#[tokio::test]
async fn test_failure_halts_branch() {
  let mut flow = Flow::new("fails");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "a", NodeType::Process, Some("explode"));
  add(&mut flow, "b", NodeType::Process, Some("record"));
  connect(&mut flow, "start", "a");
  connect(&mut flow, "a", "b");

  let (record, calls) = Recording::new(HandlerKind::Custom, json!(null));
  let mut dispatcher = ActionDispatcher::new();
  dispatcher.register(NodeType::Process, "explode", Arc::new(Failing)).unwrap();
  dispatcher.register(NodeType::Process, "record", record).unwrap();
  let log = ExecutionLog::new();

  let summary = engine(dispatcher)
    .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes, vec!["start", "a"]);
  assert_eq!(summary.failed_nodes, vec!["a"]);
  assert!(!summary.succeeded());
  assert_eq!(state_of(&flow, "a"), NodeState::Failed);
  assert_eq!(state_of(&flow, "b"), NodeState::Idle);
  assert_eq!(flow.get_node("a").unwrap().last_result, Some(json!({ "error": "boom" })));
  assert!(calls.lock().unwrap().is_empty());

  let failed = log.with_status(LogStatus::Failed);
  assert_eq!(failed.len(), 1);
  assert_eq!(failed[0].message.as_deref(), Some("boom"));
}

#[tokio::test]
async fn test_non_boolean_decision_halts_with_warning() {
  let mut flow = Flow::new("decide");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "check", NodeType::Decision, Some("fuzzy"));
  add(&mut flow, "yes", NodeType::Process, None);
  add(&mut flow, "no", NodeType::Process, None);
  connect(&mut flow, "start", "check");
  branch(&mut flow, "check", "yes", BranchTag::Affirmative);
  branch(&mut flow, "check", "no", BranchTag::Negative);

  let (condition, _) = Recording::new(HandlerKind::Condition, json!("maybe"));
  let mut dispatcher = ActionDispatcher::new();
  dispatcher.register(NodeType::Decision, "fuzzy", condition).unwrap();
  let log = ExecutionLog::new();

  let summary = engine(dispatcher)
    .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes, vec!["start", "check"]);
  assert!(summary.failed_nodes.is_empty());
  assert_eq!(summary.warnings, 1);
  assert_eq!(state_of(&flow, "yes"), NodeState::Idle);
  assert_eq!(state_of(&flow, "no"), NodeState::Idle);
  assert_eq!(log.with_status(LogStatus::Warning)[0].node_id, "check");
}

fn split_flow() -> Flow {
  let mut flow = Flow::new("split");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "a1", NodeType::Process, Some("explode"));
  add(&mut flow, "a2", NodeType::Process, Some("record"));
  add(&mut flow, "b1", NodeType::Process, Some("record"));
  add(&mut flow, "b2", NodeType::Process, Some("record"));
  connect(&mut flow, "start", "a1");
  connect(&mut flow, "start", "b1");
  connect(&mut flow, "a1", "a2");
  connect(&mut flow, "b1", "b2");
  flow
}

#[tokio::test]
async fn test_fan_out_branches_are_independent() {
  for fan_out in [FanOutMode::Concurrent, FanOutMode::Sequential] {
    let (record, calls) = Recording::new(HandlerKind::Custom, json!(1));
    let mut dispatcher = ActionDispatcher::new();
    dispatcher.register(NodeType::Process, "explode", Arc::new(Failing)).unwrap();
    dispatcher.register(NodeType::Process, "record", record).unwrap();
    let config = EngineConfig {
      fan_out,
      ..EngineConfig::default()
    };
    let engine = FlowEngine::new(Arc::new(dispatcher), config);
    let mut flow = split_flow();

    let summary = engine
      .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(summary.failed_nodes, vec!["a1"]);
    assert_eq!(state_of(&flow, "a2"), NodeState::Idle);
    assert_eq!(state_of(&flow, "b1"), NodeState::Executed);
    assert_eq!(state_of(&flow, "b2"), NodeState::Executed);
    assert_eq!(*calls.lock().unwrap(), vec!["b1", "b2"]);
  }
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
  let outbox = Arc::new(Outbox::default());
  let messages = Arc::new(Messages::default());
  let engine = engine(low_stock_dispatcher(outbox, messages));
  let mut flow = Flow::from_template("alerts", FlowTemplate::LowStockAlert);
  let state = inventory(&[1, 2, 30]);

  let mut runs = Vec::new();
  for _ in 0..2 {
    let log = ExecutionLog::new();
    let summary = engine
      .run(&mut flow, &log, state.clone(), CancellationToken::new())
      .await
      .unwrap();
    let entries: Vec<_> = log
      .entries()
      .into_iter()
      .map(|e| (e.node_id, e.status, e.result, e.message))
      .collect();
    runs.push((summary.executed_nodes, entries));
  }

  assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let mut flow = Flow::from_template("linear", FlowTemplate::Linear);
  let cancel = CancellationToken::new();
  cancel.cancel();

  let summary = engine(ActionDispatcher::new())
    .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), cancel)
    .await
    .unwrap();

  assert!(summary.cancelled);
  assert!(summary.executed_nodes.is_empty());
  assert!(!summary.succeeded());
}

#[tokio::test]
async fn test_cancelled_mid_run() {
  let mut flow = Flow::new("stoppable");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "stop", NodeType::Process, Some("stop"));
  add(&mut flow, "after", NodeType::Process, None);
  connect(&mut flow, "start", "stop");
  connect(&mut flow, "stop", "after");

  let cancel = CancellationToken::new();
  let mut dispatcher = ActionDispatcher::new();
  dispatcher
    .register(NodeType::Process, "stop", Arc::new(CancelOnRun(cancel.clone())))
    .unwrap();

  let summary = engine(dispatcher)
    .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), cancel)
    .await
    .unwrap();

  assert!(summary.cancelled);
  assert_eq!(summary.executed_nodes, vec!["start", "stop"]);
  assert_eq!(state_of(&flow, "after"), NodeState::Idle);
}

#[tokio::test]
async fn test_cycle_terminates_with_warning() {
  let mut flow = Flow::new("loop");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "a", NodeType::Process, Some("record"));
  add(&mut flow, "b", NodeType::Process, Some("record"));
  connect(&mut flow, "start", "a");
  connect(&mut flow, "a", "b");
  connect(&mut flow, "b", "a");

  let (record, calls) = Recording::new(HandlerKind::Custom, json!(null));
  let mut dispatcher = ActionDispatcher::new();
  dispatcher.register(NodeType::Process, "record", record).unwrap();
  let log = ExecutionLog::new();

  let summary = engine(dispatcher)
    .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes, vec!["start", "a", "b"]);
  assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
  assert_eq!(summary.warnings, 1);
  let warnings = log.with_status(LogStatus::Warning);
  assert_eq!(warnings[0].node_id, "a");
  assert!(warnings[0].message.as_deref().unwrap().contains("already executed"));
}

#[tokio::test]
async fn test_converging_branches_run_join_once() {
  let mut flow = Flow::new("diamond");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "left", NodeType::Process, None);
  add(&mut flow, "right", NodeType::Process, None);
  add(&mut flow, "join", NodeType::Process, Some("record"));
  connect(&mut flow, "start", "left");
  connect(&mut flow, "start", "right");
  connect(&mut flow, "left", "join");
  connect(&mut flow, "right", "join");

  let (record, calls) = Recording::new(HandlerKind::Custom, json!(null));
  let mut dispatcher = ActionDispatcher::new();
  dispatcher.register(NodeType::Process, "record", record).unwrap();

  let summary = engine(dispatcher)
    .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes.len(), 4);
  assert_eq!(summary.warnings, 1);
  assert_eq!(*calls.lock().unwrap(), vec!["join"]);
}

#[tokio::test]
async fn test_missing_handler_policy() {
  for strict in [false, true] {
    let mut flow = Flow::new("email");
    add(&mut flow, "start", NodeType::Start, None);
    add(&mut flow, "email", NodeType::Process, Some("email"));
    add(&mut flow, "end", NodeType::End, None);
    connect(&mut flow, "start", "email");
    connect(&mut flow, "email", "end");

    let config = EngineConfig {
      strict_handlers: strict,
      ..EngineConfig::default()
    };
    let engine = FlowEngine::new(Arc::new(ActionDispatcher::new()), config);
    let log = ExecutionLog::new();

    let summary = engine
      .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
      .await
      .unwrap();

    if strict {
      assert_eq!(summary.failed_nodes, vec!["email"]);
      assert_eq!(state_of(&flow, "end"), NodeState::Idle);
      assert_eq!(summary.warnings, 0);
    } else {
      assert!(summary.failed_nodes.is_empty());
      assert_eq!(state_of(&flow, "end"), NodeState::Executed);
      assert_eq!(summary.warnings, 1);
      assert_eq!(log.with_status(LogStatus::Warning)[0].node_id, "email");
    }
  }
}

#[tokio::test]
async fn test_node_limit() {
  let mut flow = Flow::new("long");
  add(&mut flow, "start", NodeType::Start, None);
  let mut previous = "start".to_string();
  for i in 0..4 {
    let id = format!("step-{}", i);
    add(&mut flow, &id, NodeType::Process, None);
    connect(&mut flow, &previous, &id);
    previous = id;
  }

  let config = EngineConfig {
    max_nodes_per_run: Some(2),
    ..EngineConfig::default()
  };
  let engine = FlowEngine::new(Arc::new(ActionDispatcher::new()), config);

  let summary = engine
    .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.executed_nodes, vec!["start", "step-0"]);
  assert_eq!(summary.warnings, 1);
}

#[tokio::test]
async fn test_observer_receives_events() {
  let (observer, mut events) = ChannelObserver::channel();
  let engine = FlowEngine::with_observer(Arc::new(ActionDispatcher::new()), EngineConfig::default(), observer);
  let mut flow = Flow::new("observed");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "end", NodeType::End, None);
  connect(&mut flow, "start", "end");

  engine
    .run(&mut flow, &ExecutionLog::new(), ExternalState::default(), CancellationToken::new())
    .await
    .unwrap();
  drop(engine);

  let mut received = Vec::new();
  while let Some(event) = events.recv().await {
    received.push(event);
  }

  assert!(matches!(received.first(), Some(FlowEvent::RunStarted { flow, .. }) if flow == "observed"));
  assert!(matches!(received.last(), Some(FlowEvent::RunCompleted { summary }) if summary.executed_nodes.len() == 2));

  let states: Vec<(String, NodeState)> = received
    .iter()
    .filter_map(|e| match e {
      FlowEvent::NodeStateChanged { node_id, state, .. } => Some((node_id.clone(), *state)),
      _ => None,
    })
    .collect();
  assert_eq!(
    states,
    vec![
      ("start".to_string(), NodeState::Executing),
      ("start".to_string(), NodeState::Executed),
      ("end".to_string(), NodeState::Executing),
      ("end".to_string(), NodeState::Executed),
    ]
  );

  let appended = received
    .iter()
    .filter(|e| matches!(e, FlowEvent::LogAppended { .. }))
    .count();
  assert_eq!(appended, 2);
}

#[tokio::test]
async fn test_run_service_rejects_overlapping_runs() {
  let gate = Arc::new(tokio::sync::Notify::new());
  let mut dispatcher = ActionDispatcher::new();
  dispatcher
    .register(NodeType::Process, "wait", Arc::new(Gate(gate.clone())))
    .unwrap();
  let service = Arc::new(RunService::new(Arc::new(engine(dispatcher))));

  let mut flow = Flow::new("slow");
  add(&mut flow, "start", NodeType::Start, None);
  add(&mut flow, "wait", NodeType::Process, Some("wait"));
  connect(&mut flow, "start", "wait");
  let mut second = flow.clone();

  let background = {
    let service = service.clone();
    tokio::spawn(async move {
      let log = ExecutionLog::new();
      service.run(&mut flow, &log, ExternalState::default()).await
    })
  };

  while !service.is_running("slow") {
    tokio::task::yield_now().await;
  }

  let err = service
    .run(&mut second, &ExecutionLog::new(), ExternalState::default())
    .await
    .unwrap_err();
  assert_eq!(err, EngineError::AlreadyRunning { flow: "slow".to_string() });

  gate.notify_one();
  let summary = background.await.unwrap().unwrap();
  assert_eq!(summary.executed_nodes, vec!["start", "wait"]);
  assert!(!service.is_running("slow"));

  service.shutdown();
  let err = service
    .run(&mut second, &ExecutionLog::new(), ExternalState::default())
    .await
    .unwrap_err();
  assert_eq!(err, EngineError::ShutDown);
}
