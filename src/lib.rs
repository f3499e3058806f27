//! # Noteflow: graph-routed note assistant workflow engine
//!
//! Noteflow routes a conversational message through one of three fixed
//! processing paths and streams ordered progress back to the caller:
//!
//! - **General**: answer directly from model knowledge.
//! - **Search**: rank the project's note files by keyword relevance, then
//!   answer grounded in the matches.
//! - **Add to note**: draft note content, then **suspend** the run until
//!   the user explicitly approves or cancels the edit.
//!
//! ## Core concepts
//!
//! - **Nodes**: async state-transition units ([`node::Node`]): classifier,
//!   note search, response generator, note generator, consent gate.
//! - **Router**: pure, total mapping from classification to path
//!   ([`router::route`]); the rest of the topology is fixed.
//! - **State**: one checkpointed record per run ([`state::WorkflowState`])
//!   with an append-only event log.
//! - **Checkpoints**: a durable revision chain per thread
//!   ([`engine::CheckpointStore`]); every node boundary persists before its
//!   events are streamed.
//! - **Suspension**: the consent gate returns an [`event::Interrupt`]
//!   instead of advancing; [`engine::WorkflowEngine::resume`] re-enters the
//!   gate later, even in a different process, from the durable checkpoint.
//! - **Streaming**: [`stream::StreamHub`] broadcasts events strictly in log
//!   order; a resumed run never re-emits events delivered before the
//!   suspension.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use noteflow::config::RuntimeConfig;
//! use noteflow::engine::{RunOutcome, TurnRequest, WorkflowEngine};
//! use noteflow::event::ResumeDecision;
//! use noteflow::llm::LanguageModel;
//! use noteflow::notes::FsNoteStore;
//! use noteflow::nodes::standard_graph;
//! use noteflow::prompts::TemplateCatalog;
//!
//! # async fn example(fast: Arc<dyn LanguageModel>, deep: Arc<dyn LanguageModel>)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let config = RuntimeConfig::from_env();
//! let notes = Arc::new(FsNoteStore::new(&config.data_dir));
//! let prompts = Arc::new(TemplateCatalog::builtin());
//!
//! let graph = standard_graph(fast, deep, notes, prompts)?;
//! let store = noteflow::engine::open_store(&config).await?;
//! let engine = WorkflowEngine::new(graph, store);
//!
//! // Stream events as they are produced.
//! let mut events = engine.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event.event.to_json_string().unwrap());
//!     }
//! });
//!
//! let thread_id = RuntimeConfig::generate_thread_id();
//! let outcome = engine
//!     .start_turn(&thread_id, TurnRequest::new("add a note about ATP", "biology"))
//!     .await?;
//!
//! if let RunOutcome::Suspended { interrupt } = outcome {
//!     // Show `interrupt.message` to the user, then:
//!     engine.resume(&thread_id, ResumeDecision::approve()).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module guide
//!
//! - [`message`] - Conversation history entries
//! - [`event`] - Output events, interrupts, resume decisions
//! - [`state`] - The checkpointed workflow record and snapshots
//! - [`types`] - Node identities
//! - [`node`] - Node trait and execution primitives
//! - [`nodes`] - The five node implementations
//! - [`router`] - Deterministic path routing
//! - [`graph`] - Immutable node table construction
//! - [`llm`] / [`notes`] / [`prompts`] - Collaborator interfaces
//! - [`stream`] - Ordered event broadcasting
//! - [`engine`] - Execution engine and checkpoint stores
//! - [`config`] - Environment-resolved runtime configuration

pub mod config;
pub mod engine;
pub mod event;
pub mod graph;
pub mod llm;
pub mod message;
pub mod node;
pub mod nodes;
pub mod notes;
pub mod prompts;
pub mod router;
pub mod state;
pub mod stream;
pub mod telemetry;
pub mod types;
