//! Flowgraph Engine
//!
//! This crate executes flows built with `flowgraph-model`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RunService                           │
//! │  - one in-flight run per flow name                          │
//! │  - cancel(name), shutdown()                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        FlowEngine                           │
//! │  - run(flow, log, state, cancel) → RunSummary               │
//! │  - traversal from the start node, decision branching,       │
//! │    fan-out, per-node state, observer events                 │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                            │
//!                  ▼                            ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────┐
//! │       ActionDispatcher       │  │       ExecutionLog       │
//! │  (NodeType, action) → handler│  │  append-only, streamed   │
//! └──────────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use flowgraph_engine::{ActionDispatcher, EngineConfig, ExecutionLog, ExternalState, FlowEngine};
//! use flowgraph_engine::handlers::LogHandler;
//! use flowgraph_model::NodeType;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut dispatcher = ActionDispatcher::new();
//! dispatcher.register(NodeType::Process, "log", Arc::new(LogHandler::default()))?;
//!
//! let engine = FlowEngine::new(Arc::new(dispatcher), EngineConfig::default());
//! let log = ExecutionLog::new();
//! let summary = engine
//!   .run(&mut flow, &log, ExternalState::default(), CancellationToken::new())
//!   .await?;
//! ```

mod config;
mod context;
mod dispatcher;
mod engine;
mod error;
mod events;
pub mod handlers;
mod log;
mod service;
mod summary;

pub use config::{EngineConfig, FanOutMode};
pub use context::{ActionContext, ExternalState};
pub use dispatcher::{ActionDispatcher, ActionHandler, ActionKey, Dispatched, HandlerKind};
pub use engine::FlowEngine;
pub use error::{ActionError, DispatchError, EngineError};
pub use events::{ChannelObserver, FlowEvent, FlowObserver, NoopObserver};
pub use log::{ExecutionLog, LogEntry, LogSink, LogStatus};
pub use service::RunService;
pub use summary::RunSummary;
