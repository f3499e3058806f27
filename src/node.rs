//! Node execution primitives.
//!
//! A [`Node`] is one state-transition unit of the workflow graph. Nodes are
//! stateless: they read a [`StateSnapshot`], call their collaborators, and
//! return a [`NodeOutcome`]: either a partial update to advance with, or a
//! suspension carrying an [`Interrupt`] for the caller. Nodes return only
//! the events *they* produced; concatenation onto the run log is the
//! engine's job.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::event::{Interrupt, OutputEvent, ResumeDecision};
use crate::llm::ProviderError;
use crate::prompts::PromptError;
use crate::state::{FoundFile, QueryType, StateSnapshot};
use crate::types::NodeKind;

/// Core trait for executable workflow nodes.
///
/// # Error Handling
///
/// Returning `Err(NodeError)` ends the run. Recoverable conditions (a
/// malformed classifier reply, an unreadable note file) are absorbed inside
/// the node and degrade the partial update instead.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node against the given snapshot.
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext)
        -> Result<NodeOutcome, NodeError>;
}

/// Execution context passed to a node.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// The thread this run belongs to.
    pub thread_id: String,
    /// Identity of the executing node.
    pub node: NodeKind,
    /// Present only when the engine is re-entering a suspended node with the
    /// caller's decision.
    pub resume: Option<ResumeDecision>,
}

impl NodeContext {
    #[must_use]
    pub fn new(thread_id: impl Into<String>, node: NodeKind) -> Self {
        Self {
            thread_id: thread_id.into(),
            node,
            resume: None,
        }
    }

    #[must_use]
    pub fn with_resume(mut self, decision: ResumeDecision) -> Self {
        self.resume = Some(decision);
        self
    }
}

/// Partial state update returned by node execution.
///
/// All fields are optional; a node touches only the state it owns. `events`
/// holds the output events this node produced, in emission order.
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    pub query_type: Option<QueryType>,
    pub search_query: Option<String>,
    pub found_files: Option<Vec<FoundFile>>,
    pub file_contents: Option<String>,
    pub pending_note_edit: Option<String>,
    pub events: Vec<OutputEvent>,
}

impl NodePartial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = Some(query_type);
        self
    }

    #[must_use]
    pub fn with_search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_found_files(mut self, files: Vec<FoundFile>) -> Self {
        self.found_files = Some(files);
        self
    }

    #[must_use]
    pub fn with_file_contents(mut self, contents: impl Into<String>) -> Self {
        self.file_contents = Some(contents.into());
        self
    }

    #[must_use]
    pub fn with_pending_note_edit(mut self, content: impl Into<String>) -> Self {
        self.pending_note_edit = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: OutputEvent) -> Self {
        self.events.push(event);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Vec<OutputEvent>) -> Self {
        self.events.extend(events);
        self
    }
}

/// What a node asks the engine to do next.
#[derive(Clone, Debug)]
pub enum NodeOutcome {
    /// Merge the partial and continue to the successor node (or finish).
    Advance(NodePartial),
    /// Merge the partial, persist, and hand the interrupt to the caller.
    /// The run stays parked at this node until resumed.
    Suspend {
        partial: NodePartial,
        interrupt: Interrupt,
    },
}

impl NodeOutcome {
    #[must_use]
    pub fn advance(partial: NodePartial) -> Self {
        NodeOutcome::Advance(partial)
    }

    #[must_use]
    pub fn suspend(partial: NodePartial, interrupt: Interrupt) -> Self {
        NodeOutcome::Suspend { partial, interrupt }
    }
}

/// Fatal errors from node execution. These end the run.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(noteflow::node::missing_input),
        help("Check that the preceding node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// The language-model call failed; terminal for the run.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    /// A prompt template could not be rendered.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] PromptError),
}
