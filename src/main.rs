use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowgraph_engine::handlers::{
  ConditionHandler, DataFetchHandler, LogHandler, MessageSink, Notifier, NotifyHandler,
};
use flowgraph_engine::{
  ActionDispatcher, ActionError, EngineConfig, ExecutionLog, ExternalState, FlowEngine, LogEntry, LogStatus,
  RunService,
};
use flowgraph_model::{Flow, FlowTemplate, NodeType};
use flowgraph_store::{FlowRepository, FsKvStore};

/// Flowgraph - build, validate and run node-and-edge flows
#[derive(Parser)]
#[command(name = "flowgraph")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.flowgraph)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Engine configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a flow document for structural errors
  Validate {
    /// Path to the flow document (JSON)
    flow_file: PathBuf,
  },

  /// Run a flow document with the built-in handlers
  Run {
    /// Path to the flow document (JSON)
    flow_file: PathBuf,

    /// External state handed to handlers (JSON), e.g. `{"inventory": [...]}`
    #[arg(long)]
    state: Option<PathBuf>,
  },

  /// Store a flow document in the data directory
  Save {
    /// Path to the flow document (JSON)
    flow_file: PathBuf,
  },

  /// Print a stored flow document
  Show {
    /// Flow name
    name: String,
  },

  /// List stored flows
  List,

  /// Create a flow from a template and print its document
  New {
    /// Flow name
    name: String,

    /// Template: linear or low-stock
    #[arg(long, default_value = "linear")]
    template: String,

    /// Also store the new flow in the data directory
    #[arg(long)]
    save: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowgraph=info,warn")),
    )
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".flowgraph"),
  };

  match cli.command {
    Some(Commands::Validate { flow_file }) => validate(&flow_file).await,
    Some(Commands::Run { flow_file, state }) => {
      let config = load_config(cli.config.as_deref()).await?;
      run(&flow_file, state.as_deref(), config).await
    }
    Some(Commands::Save { flow_file }) => save(&flow_file, &data_dir).await,
    Some(Commands::Show { name }) => show(&name, &data_dir).await,
    Some(Commands::List) => list(&data_dir).await,
    Some(Commands::New {
      name,
      template,
      save,
    }) => new_flow(&name, &template, save, &data_dir).await,
    None => {
      println!("flowgraph - use --help to see available commands");
      Ok(())
    }
  }
}

async fn validate(flow_file: &Path) -> Result<()> {
  let flow = read_flow(flow_file).await?;
  let errors = flow.validate();
  if errors.is_empty() {
    eprintln!(
      "Flow '{}' is valid ({} nodes, {} edges)",
      flow.name,
      flow.nodes.len(),
      flow.edges.len()
    );
    return Ok(());
  }

  for error in &errors {
    eprintln!("  - {}", error);
  }
  bail!("flow '{}' has {} structural error(s)", flow.name, errors.len())
}

async fn run(flow_file: &Path, state_file: Option<&Path>, config: EngineConfig) -> Result<()> {
  let mut flow = read_flow(flow_file).await?;
  let state = match state_file {
    Some(path) => ExternalState::new(read_json(path).await?),
    None => ExternalState::default(),
  };
  eprintln!("Loaded flow: {}", flow.name);

  let engine = FlowEngine::new(Arc::new(builtin_dispatcher()?), config);
  let service = RunService::new(Arc::new(engine));
  let log = ExecutionLog::new();

  let printer = tokio::spawn(stream_entries(log.subscribe(), print_entry));

  let name = flow.name.clone();
  let summary = {
    let run = service.run(&mut flow, &log, state);
    tokio::pin!(run);
    tokio::select! {
      result = &mut run => result,
      _ = tokio::signal::ctrl_c() => {
        warn!(flow = %name, "interrupted, cancelling run");
        service.cancel(&name);
        run.await
      }
    }
  }
  .with_context(|| format!("failed to run flow '{}'", name))?;

  drop(log);
  let _ = printer.await;

  println!("{}", serde_json::to_string_pretty(&summary)?);
  if !summary.succeeded() {
    bail!(
      "flow '{}' finished with {} failed node(s){}",
      name,
      summary.failed_nodes.len(),
      if summary.cancelled { " after cancellation" } else { "" }
    );
  }
  Ok(())
}

async fn save(flow_file: &Path, data_dir: &Path) -> Result<()> {
  let flow = read_flow(flow_file).await?;
  let errors = flow.validate();
  if !errors.is_empty() {
    warn!(flow = %flow.name, errors = errors.len(), "saving a structurally invalid flow");
  }

  repository(data_dir)
    .save(&flow)
    .await
    .with_context(|| format!("failed to save flow '{}'", flow.name))?;
  info!(flow = %flow.name, data_dir = %data_dir.display(), "flow saved");
  Ok(())
}

async fn show(name: &str, data_dir: &Path) -> Result<()> {
  let flow = repository(data_dir)
    .load(name)
    .await
    .with_context(|| format!("failed to load flow '{}'", name))?
    .with_context(|| format!("flow '{}' not found", name))?;

  println!("{}", serde_json::to_string_pretty(&flow.to_doc())?);
  Ok(())
}

async fn list(data_dir: &Path) -> Result<()> {
  let names = repository(data_dir)
    .list()
    .await
    .context("failed to list flows")?;
  for name in names {
    println!("{}", name);
  }
  Ok(())
}

async fn new_flow(name: &str, template: &str, save: bool, data_dir: &Path) -> Result<()> {
  let template = FlowTemplate::from_name(template)
    .with_context(|| format!("unknown template '{}' (expected linear or low-stock)", template))?;
  let flow = Flow::from_template(name, template);

  if save {
    repository(data_dir)
      .save(&flow)
      .await
      .with_context(|| format!("failed to save flow '{}'", name))?;
    info!(flow = %name, "flow saved");
  }

  println!("{}", serde_json::to_string_pretty(&flow.to_doc())?);
  Ok(())
}

fn repository(data_dir: &Path) -> FlowRepository<FsKvStore> {
  FlowRepository::new(FsKvStore::new(data_dir.join("flows")))
}

fn builtin_dispatcher() -> Result<ActionDispatcher> {
  let mut dispatcher = ActionDispatcher::new();
  dispatcher.register(NodeType::Data, "fetch", Arc::new(DataFetchHandler::default()))?;
  dispatcher.register(NodeType::Process, "log", Arc::new(LogHandler::new(Arc::new(StderrSink))))?;
  dispatcher.register(
    NodeType::Process,
    "notify",
    Arc::new(NotifyHandler::new(Arc::new(StderrOutbox))),
  )?;
  Arc::new(ConditionHandler::with_builtins()).register_all(&mut dispatcher)?;
  Ok(dispatcher)
}

async fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
  match path {
    Some(path) => serde_json::from_value(read_json(path).await?)
      .with_context(|| format!("failed to parse engine config: {}", path.display())),
    None => Ok(EngineConfig::default()),
  }
}

async fn read_flow(path: &Path) -> Result<Flow> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read flow file: {}", path.display()))?;
  flowgraph_store::deserialize(&bytes).with_context(|| format!("failed to parse flow file: {}", path.display()))
}

async fn read_json(path: &Path) -> Result<serde_json::Value> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse JSON in {}", path.display()))
}

/// Feed every received entry to `each` until the log is dropped. Returns how
/// many entries were skipped because the receiver fell behind.
async fn stream_entries(mut entries: broadcast::Receiver<LogEntry>, mut each: impl FnMut(&LogEntry)) -> u64 {
  let mut skipped = 0;
  loop {
    match entries.recv().await {
      Ok(entry) => each(&entry),
      Err(RecvError::Lagged(n)) => {
        warn!(skipped = n, "log output fell behind, entries skipped");
        skipped += n;
      }
      Err(RecvError::Closed) => return skipped,
    }
  }
}

fn print_entry(entry: &LogEntry) {
  let status = match entry.status {
    LogStatus::Executing => "executing",
    LogStatus::Completed => "completed",
    LogStatus::Failed => "FAILED",
    LogStatus::Warning => "warning",
  };
  let detail = match (&entry.message, &entry.result) {
    (Some(message), _) => format!(": {}", message),
    (None, Some(result)) if !result.is_null() => format!(" -> {}", result),
    _ => String::new(),
  };
  eprintln!(
    "{} [{}] {} ({}){}",
    entry.timestamp.format("%H:%M:%S%.3f"),
    status,
    entry.label,
    entry.node_id,
    detail
  );
}

/// Prints log-node messages.
struct StderrSink;

impl MessageSink for StderrSink {
  fn write(&self, node_id: &str, message: &str) {
    eprintln!("  log({}): {}", node_id, message);
  }
}

/// Prints notifications instead of delivering them.
struct StderrOutbox;

#[async_trait]
impl Notifier for StderrOutbox {
  async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ActionError> {
    eprintln!("  outbox -> {}: {}\n    {}", recipient, subject, body);
    Ok(())
  }
}
