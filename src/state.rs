//! Workflow state: the checkpointed record a run mutates.
//!
//! The engine exclusively owns [`WorkflowState`] mutation during a run.
//! Nodes receive a read-only [`StateSnapshot`] and hand back a
//! [`NodePartial`](crate::node::NodePartial) describing only what they
//! changed and the events they produced; the engine merges partials via
//! [`WorkflowState::apply`]. The `output_messages` log is append-only and is
//! the authoritative, replayable record of everything the run emitted.

use serde::{Deserialize, Serialize};

use crate::event::OutputEvent;
use crate::message::Message;
use crate::node::NodePartial;

/// How the classifier categorized the current user message.
///
/// Set exactly once per run; [`WorkflowState::apply`] ignores any later
/// attempt to overwrite it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    /// Not yet classified. Only valid before the classifier has run.
    #[default]
    Unset,
    /// The answer should be grounded in the project's note files.
    Search,
    /// The user wants content drafted into a note.
    AddToNote,
    /// Answer from general knowledge.
    General,
}

impl QueryType {
    /// Parse the classifier's string label. Unknown labels yield `None`;
    /// the caller decides the fallback.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "SEARCH" => Some(QueryType::Search),
            "ADD_TO_NOTE" => Some(QueryType::AddToNote),
            "GENERAL" => Some(QueryType::General),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, QueryType::Unset)
    }
}

/// A note file matched by the search node, with its relevance score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundFile {
    /// Project the file belongs to.
    pub project: String,
    /// File identifier (name without extension).
    pub file: String,
    /// Store-relative path.
    pub path: String,
    /// Full file content.
    pub content: String,
    /// Count of distinct query terms occurring in the content.
    pub relevance: u32,
}

/// The checkpointed record for one run of the workflow.
///
/// Constructed via [`WorkflowState::builder`], mutated only by the engine,
/// persisted at every node boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Current turn's input; immutable within a run.
    pub user_message: String,
    /// Scoping key for note search; opaque to the engine.
    pub project_id: String,
    /// Prior turns; read-only within a run.
    pub conversation_history: Vec<Message>,
    /// Text the user highlighted in the editor, if any.
    pub highlighted_text: Option<String>,
    /// Content of the file open in the editor, if any.
    pub active_file_content: Option<String>,
    /// Classification result; set exactly once per run.
    pub query_type: QueryType,
    /// Comma-joined search terms; populated only on the search path.
    pub search_query: String,
    /// Ranked matches, at most [`crate::nodes::search::TOP_K_FILES`] entries.
    pub found_files: Vec<FoundFile>,
    /// Labeled concatenation of found-file contents; empty when none found.
    pub file_contents: String,
    /// Drafted note content awaiting consent; cleared when the gate resolves.
    pub pending_note_edit: String,
    /// Append-only event log; the authoritative stream record.
    pub output_messages: Vec<OutputEvent>,
}

/// Read-only view of state handed to nodes during execution.
///
/// Snapshots are clones: a node can hold one across an await point without
/// observing later engine mutation.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub user_message: String,
    pub project_id: String,
    pub conversation_history: Vec<Message>,
    pub highlighted_text: Option<String>,
    pub active_file_content: Option<String>,
    pub query_type: QueryType,
    pub search_query: String,
    pub found_files: Vec<FoundFile>,
    pub file_contents: String,
    pub pending_note_edit: String,
    /// Length of the event log at snapshot time.
    pub emitted_events: usize,
}

impl StateSnapshot {
    /// The highlighted text or the `"None"` sentinel used in prompts.
    #[must_use]
    pub fn highlighted_or_sentinel(&self) -> &str {
        self.highlighted_text.as_deref().unwrap_or("None")
    }

    /// The active file content or the `"None"` sentinel used in prompts.
    #[must_use]
    pub fn active_file_or_sentinel(&self) -> &str {
        self.active_file_content.as_deref().unwrap_or("None")
    }
}

impl WorkflowState {
    /// Builder for assembling the initial state of a turn.
    #[must_use]
    pub fn builder() -> WorkflowStateBuilder {
        WorkflowStateBuilder::default()
    }

    /// Creates an immutable snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            user_message: self.user_message.clone(),
            project_id: self.project_id.clone(),
            conversation_history: self.conversation_history.clone(),
            highlighted_text: self.highlighted_text.clone(),
            active_file_content: self.active_file_content.clone(),
            query_type: self.query_type,
            search_query: self.search_query.clone(),
            found_files: self.found_files.clone(),
            file_contents: self.file_contents.clone(),
            pending_note_edit: self.pending_note_edit.clone(),
            emitted_events: self.output_messages.len(),
        }
    }

    /// Merge a node's partial update into the state.
    ///
    /// Merge semantics are explicit and engine-owned: scalar fields replace
    /// only when the partial carries them, `query_type` is set-once, and
    /// events are concatenated onto the log, never overwritten.
    pub fn apply(&mut self, partial: NodePartial) {
        if let Some(query_type) = partial.query_type {
            if self.query_type.is_unset() {
                self.query_type = query_type;
            } else {
                tracing::warn!(
                    current = ?self.query_type,
                    attempted = ?query_type,
                    "ignoring attempt to reclassify within a run"
                );
            }
        }
        if let Some(search_query) = partial.search_query {
            self.search_query = search_query;
        }
        if let Some(found_files) = partial.found_files {
            self.found_files = found_files;
        }
        if let Some(file_contents) = partial.file_contents {
            self.file_contents = file_contents;
        }
        if let Some(pending_note_edit) = partial.pending_note_edit {
            self.pending_note_edit = pending_note_edit;
        }
        self.output_messages.extend(partial.events);
    }
}

/// Fluent builder for [`WorkflowState`].
///
/// ```
/// use noteflow::message::Message;
/// use noteflow::state::WorkflowState;
///
/// let state = WorkflowState::builder()
///     .user_message("what makes energy in cells")
///     .project_id("biology")
///     .history(vec![Message::user("hi"), Message::assistant("hello")])
///     .build();
///
/// assert_eq!(state.conversation_history.len(), 2);
/// assert!(state.output_messages.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct WorkflowStateBuilder {
    user_message: String,
    project_id: String,
    conversation_history: Vec<Message>,
    highlighted_text: Option<String>,
    active_file_content: Option<String>,
}

impl WorkflowStateBuilder {
    #[must_use]
    pub fn user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self
    }

    #[must_use]
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    #[must_use]
    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }

    #[must_use]
    pub fn highlighted_text(mut self, text: impl Into<String>) -> Self {
        self.highlighted_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn active_file_content(mut self, content: impl Into<String>) -> Self {
        self.active_file_content = Some(content.into());
        self
    }

    #[must_use]
    pub fn build(self) -> WorkflowState {
        WorkflowState {
            user_message: self.user_message,
            project_id: self.project_id,
            conversation_history: self.conversation_history,
            highlighted_text: self.highlighted_text,
            active_file_content: self.active_file_content,
            ..WorkflowState::default()
        }
    }
}
