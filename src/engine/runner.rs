//! The workflow engine: drives node execution for a thread.
//!
//! One invocation = one run segment: either a fresh user turn entering at
//! the classifier, or a resume re-entering the consent gate. The engine
//! owns all state mutation, persists a new checkpoint revision at every
//! node boundary, and only after a revision is durable does it broadcast
//! that node's events (write-then-yield). Suspension is a return value,
//! not control-flow trickery: a suspending node hands back an
//! [`Interrupt`], and [`WorkflowEngine::resume`] is the distinct entry
//! point that continues the parked run.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use crate::engine::checkpoint::{
    Checkpoint, CheckpointError, CheckpointStore, LeaseRegistry, RunStatus,
};
use crate::event::{Interrupt, OutputEvent, ResumeDecision};
use crate::graph::WorkflowGraph;
use crate::message::Message;
use crate::node::{NodeContext, NodeError, NodeOutcome};
use crate::router::successor;
use crate::state::WorkflowState;
use crate::stream::{EventStream, StreamHub};
use crate::types::NodeKind;

/// Final event content when the language-model provider fails mid-run.
const PROVIDER_APOLOGY: &str =
    "Sorry, I ran into a problem while generating a response. Please try again in a moment.";

/// Inputs for a new user turn on a thread.
#[derive(Clone, Debug, Default)]
pub struct TurnRequest {
    pub user_message: String,
    pub project_id: String,
    pub conversation_history: Vec<Message>,
    pub highlighted_text: Option<String>,
    pub active_file_content: Option<String>,
}

impl TurnRequest {
    #[must_use]
    pub fn new(user_message: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }

    #[must_use]
    pub fn with_highlighted_text(mut self, text: impl Into<String>) -> Self {
        self.highlighted_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_active_file_content(mut self, content: impl Into<String>) -> Self {
        self.active_file_content = Some(content.into());
        self
    }

    fn into_state(self) -> WorkflowState {
        let mut builder = WorkflowState::builder()
            .user_message(self.user_message)
            .project_id(self.project_id)
            .history(self.conversation_history);
        if let Some(text) = self.highlighted_text {
            builder = builder.highlighted_text(text);
        }
        if let Some(content) = self.active_file_content {
            builder = builder.active_file_content(content);
        }
        builder.build()
    }
}

/// How a run segment ended.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// The run reached a terminal node; `state` is the final record.
    Completed { state: WorkflowState },
    /// The run is parked at the consent gate awaiting the caller's
    /// decision.
    Suspended { interrupt: Interrupt },
}

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    /// Another caller is currently running this thread.
    #[error("thread {thread_id} is busy: a run is already in progress")]
    #[diagnostic(
        code(noteflow::engine::thread_busy),
        help("Wait for the in-flight run to finish or suspend, then retry.")
    )]
    ThreadBusy { thread_id: String },

    /// A new turn arrived while the thread is parked at the consent gate.
    #[error("thread {thread_id} is awaiting consent; resolve the pending note edit first")]
    #[diagnostic(
        code(noteflow::engine::consent_pending),
        help("Resume the thread with an approval or cancellation decision.")
    )]
    ConsentPending { thread_id: String },

    /// Resume was called but the thread has nothing to resume.
    #[error("thread {thread_id} has no suspended run to resume")]
    #[diagnostic(code(noteflow::engine::not_suspended))]
    NotSuspended { thread_id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Runtime execution engine for the note-assistant workflow.
///
/// Holds the immutable graph by handle, a pluggable [`CheckpointStore`],
/// the broadcast [`StreamHub`], and the per-thread lease registry. One
/// engine serves many threads concurrently; each thread's run is
/// sequential and exclusive.
pub struct WorkflowEngine {
    graph: WorkflowGraph,
    store: Arc<dyn CheckpointStore>,
    hub: Arc<StreamHub>,
    leases: Arc<LeaseRegistry>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(graph: WorkflowGraph, store: Arc<dyn CheckpointStore>) -> Self {
        Self::with_hub(graph, store, StreamHub::new(StreamHub::DEFAULT_CAPACITY))
    }

    #[must_use]
    pub fn with_hub(
        graph: WorkflowGraph,
        store: Arc<dyn CheckpointStore>,
        hub: Arc<StreamHub>,
    ) -> Self {
        Self {
            graph,
            store,
            hub,
            leases: LeaseRegistry::new(),
        }
    }

    /// Subscribe to the live event stream for all threads on this engine.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.hub.subscribe()
    }

    /// The engine's broadcast hub, for wiring additional consumers.
    #[must_use]
    pub fn hub(&self) -> Arc<StreamHub> {
        Arc::clone(&self.hub)
    }

    /// Run a new user turn on `thread_id` from the classifier onward.
    ///
    /// Rejected while another run holds the thread, or while the thread is
    /// parked at the consent gate.
    #[instrument(skip(self, request), err)]
    pub async fn start_turn(
        &self,
        thread_id: &str,
        request: TurnRequest,
    ) -> Result<RunOutcome, EngineError> {
        let _lease = self
            .leases
            .acquire(thread_id)
            .ok_or_else(|| EngineError::ThreadBusy {
                thread_id: thread_id.to_string(),
            })?;

        let prior = self.store.load_latest(thread_id).await?;
        let revision = match &prior {
            Some(cp) if cp.status == RunStatus::AwaitingConsent => {
                return Err(EngineError::ConsentPending {
                    thread_id: thread_id.to_string(),
                });
            }
            Some(cp) => cp.revision,
            None => 0,
        };

        tracing::info!(thread = %thread_id, "turn started");
        self.drive(thread_id, request.into_state(), revision, WorkflowGraph::ENTRY, None)
            .await
    }

    /// Continue a run parked at the consent gate with the caller's
    /// decision.
    #[instrument(skip(self, decision), err)]
    pub async fn resume(
        &self,
        thread_id: &str,
        decision: ResumeDecision,
    ) -> Result<RunOutcome, EngineError> {
        let _lease = self
            .leases
            .acquire(thread_id)
            .ok_or_else(|| EngineError::ThreadBusy {
                thread_id: thread_id.to_string(),
            })?;

        let checkpoint = self.store.load_latest(thread_id).await?;
        let Some(checkpoint) = checkpoint else {
            return Err(EngineError::NotSuspended {
                thread_id: thread_id.to_string(),
            });
        };
        if checkpoint.status != RunStatus::AwaitingConsent {
            return Err(EngineError::NotSuspended {
                thread_id: thread_id.to_string(),
            });
        }

        tracing::info!(thread = %thread_id, "resuming suspended run");
        self.drive(
            thread_id,
            checkpoint.state,
            checkpoint.revision,
            NodeKind::ConsentGate,
            Some(decision),
        )
        .await
    }

    /// Execute nodes from `next` until the run finishes or suspends.
    ///
    /// At every boundary: merge the node's partial, persist the new
    /// revision, then broadcast exactly the events appended by that node.
    /// Events persisted before this invocation started are never
    /// re-broadcast, which is what keeps resume replay-free.
    async fn drive(
        &self,
        thread_id: &str,
        mut state: WorkflowState,
        mut revision: u64,
        mut next: NodeKind,
        mut resume: Option<ResumeDecision>,
    ) -> Result<RunOutcome, EngineError> {
        loop {
            let node = self.graph.node(next);
            let mut ctx = NodeContext::new(thread_id, next);
            if let Some(decision) = resume.take() {
                ctx = ctx.with_resume(decision);
            }

            tracing::debug!(thread = %thread_id, node = %next, revision, "executing node");
            let outcome = match node.run(state.snapshot(), ctx).await {
                Ok(outcome) => outcome,
                Err(NodeError::Provider(err)) => {
                    tracing::error!(thread = %thread_id, node = %next, error = %err,
                        "provider failure, ending run");
                    let cursor = state.output_messages.len();
                    state
                        .output_messages
                        .push(OutputEvent::final_answer(PROVIDER_APOLOGY));
                    revision += 1;
                    self.store
                        .save(Checkpoint::new(
                            thread_id,
                            revision,
                            RunStatus::Completed,
                            state.clone(),
                        ))
                        .await?;
                    self.broadcast_from(thread_id, &state, cursor);
                    return Err(EngineError::Node(NodeError::Provider(err)));
                }
                Err(err) => return Err(err.into()),
            };

            match outcome {
                NodeOutcome::Advance(partial) => {
                    let cursor = state.output_messages.len();
                    state.apply(partial);
                    let following = successor(next, state.query_type);
                    let status = match following {
                        Some(node) => RunStatus::InProgress { next: node },
                        None => RunStatus::Completed,
                    };
                    revision += 1;
                    self.store
                        .save(Checkpoint::new(thread_id, revision, status, state.clone()))
                        .await?;
                    self.broadcast_from(thread_id, &state, cursor);

                    match following {
                        Some(node) => next = node,
                        None => {
                            tracing::info!(thread = %thread_id, revision, "run completed");
                            return Ok(RunOutcome::Completed { state });
                        }
                    }
                }
                NodeOutcome::Suspend { partial, interrupt } => {
                    let cursor = state.output_messages.len();
                    state.apply(partial);
                    revision += 1;
                    self.store
                        .save(Checkpoint::new(
                            thread_id,
                            revision,
                            RunStatus::AwaitingConsent,
                            state.clone(),
                        ))
                        .await?;
                    self.broadcast_from(thread_id, &state, cursor);
                    // Relay the consent request to stream-only consumers.
                    // Not part of the persisted log: the interrupt is
                    // transient and travels in the return value.
                    self.hub.publish(thread_id, interrupt.to_event());
                    tracing::info!(thread = %thread_id, revision, "run suspended for consent");
                    return Ok(RunOutcome::Suspended { interrupt });
                }
            }
        }
    }

    fn broadcast_from(&self, thread_id: &str, state: &WorkflowState, cursor: usize) {
        for event in &state.output_messages[cursor..] {
            self.hub.publish(thread_id, event.clone());
        }
    }
}
