//! Run coordination.
//!
//! The `RunService` wraps a [`FlowEngine`] and guarantees at most one
//! in-flight run per flow name. Each run gets a child of the service's root
//! cancellation token, so a single run can be cancelled by name or every run
//! at once on shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowgraph_model::Flow;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::ExternalState;
use crate::engine::FlowEngine;
use crate::error::EngineError;
use crate::events::{FlowObserver, NoopObserver};
use crate::log::LogSink;
use crate::summary::RunSummary;

/// Coordinates runs of many flows over one engine.
///
/// # Usage
///
/// ```ignore
/// let service = RunService::new(Arc::new(engine));
///
/// // From a UI "run" button
/// let summary = service.run(&mut flow, &log, state).await?;
///
/// // From a UI "stop" button
/// service.cancel("inventory-check");
/// ```
pub struct RunService<N: FlowObserver = NoopObserver> {
  engine: Arc<FlowEngine<N>>,
  active: Mutex<HashMap<String, CancellationToken>>,
  root: CancellationToken,
}

impl<N: FlowObserver> RunService<N> {
  pub fn new(engine: Arc<FlowEngine<N>>) -> Self {
    Self {
      engine,
      active: Mutex::new(HashMap::new()),
      root: CancellationToken::new(),
    }
  }

  pub fn engine(&self) -> &FlowEngine<N> {
    &self.engine
  }

  /// Run `flow`, rejecting the call if a run of the same flow is in flight.
  pub async fn run(
    &self,
    flow: &mut Flow,
    log: &dyn LogSink,
    state: ExternalState,
  ) -> Result<RunSummary, EngineError> {
    let cancel = self.claim(&flow.name)?;
    let _guard = ActiveRun {
      service: self,
      flow: flow.name.clone(),
    };

    self.engine.run(flow, log, state, cancel).await
  }

  /// Whether a run of `flow` is in flight.
  pub fn is_running(&self, flow: &str) -> bool {
    self.lock().contains_key(flow)
  }

  /// Cancel the in-flight run of `flow`. Returns false if none is running.
  pub fn cancel(&self, flow: &str) -> bool {
    match self.lock().get(flow) {
      Some(token) => {
        info!(flow = %flow, "run cancellation requested");
        token.cancel();
        true
      }
      None => false,
    }
  }

  /// Cancel every in-flight run and reject new ones.
  pub fn shutdown(&self) {
    info!(active = self.lock().len(), "run service shutting down");
    self.root.cancel();
  }

  fn claim(&self, flow: &str) -> Result<CancellationToken, EngineError> {
    if self.root.is_cancelled() {
      return Err(EngineError::ShutDown);
    }

    let mut active = self.lock();
    if active.contains_key(flow) {
      return Err(EngineError::AlreadyRunning {
        flow: flow.to_string(),
      });
    }
    let token = self.root.child_token();
    active.insert(flow.to_string(), token.clone());
    Ok(token)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
    self.active.lock().unwrap_or_else(|e| e.into_inner())
  }
}

/// Releases the flow's slot when the run ends, including on early drop.
struct ActiveRun<'a, N: FlowObserver> {
  service: &'a RunService<N>,
  flow: String,
}

impl<N: FlowObserver> Drop for ActiveRun<'_, N> {
  fn drop(&mut self) {
    self.service.lock().remove(&self.flow);
  }
}
