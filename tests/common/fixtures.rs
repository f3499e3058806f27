//! Shared test doubles: a scripted language model, an in-memory note store,
//! and engine assembly helpers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use noteflow::engine::{CheckpointStore, InMemoryCheckpointStore, WorkflowEngine};
use noteflow::event::{EventKind, OutputEvent};
use noteflow::graph::WorkflowGraph;
use noteflow::llm::{LanguageModel, ProviderError};
use noteflow::nodes::standard_graph;
use noteflow::notes::{NoteFile, NoteStore, NoteStoreError};
use noteflow::prompts::TemplateCatalog;

/// One scripted model reply.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Text(String),
    Failure,
}

/// Deterministic [`LanguageModel`] double: pops scripted replies in order
/// and records every prompt pair it was called with.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(replies: &[&str]) -> Arc<Self> {
        Self::new(
            replies
                .iter()
                .map(|r| ScriptedReply::Text((*r).to_string()))
                .collect(),
        )
    }

    pub fn failing() -> Arc<Self> {
        Self::new(vec![ScriptedReply::Failure])
    }

    /// Every `(system, user)` prompt pair seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure) => Err(ProviderError::Request {
                provider: "scripted",
                message: "injected failure".to_string(),
            }),
            None => Err(ProviderError::Request {
                provider: "scripted",
                message: "scripted replies exhausted".to_string(),
            }),
        }
    }
}

/// Wraps a model so a test can observe a call starting and hold it open,
/// for exercising per-thread exclusivity.
pub struct GatedModel {
    inner: Arc<ScriptedModel>,
    entered: tokio::sync::mpsc::UnboundedSender<()>,
    gate: Arc<Semaphore>,
}

impl GatedModel {
    /// Returns the model, a receiver signalled when a call enters, and the
    /// semaphore to release held calls.
    pub fn new(
        inner: Arc<ScriptedModel>,
    ) -> (
        Arc<Self>,
        tokio::sync::mpsc::UnboundedReceiver<()>,
        Arc<Semaphore>,
    ) {
        let (entered, entered_rx) = tokio::sync::mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        (
            Arc::new(Self {
                inner,
                entered,
                gate: Arc::clone(&gate),
            }),
            entered_rx,
            gate,
        )
    }
}

#[async_trait]
impl LanguageModel for GatedModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let _ = self.entered.send(());
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.inner.complete(system, user).await
    }
}

/// In-memory [`NoteStore`]: files keep insertion order, `None` content
/// marks a file as unreadable.
#[derive(Default)]
pub struct MemoryNoteStore {
    projects: Vec<(String, Vec<(String, Option<String>)>)>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project_id: &str, files: &[(&str, &str)]) -> Self {
        self.projects.push((
            project_id.to_string(),
            files
                .iter()
                .map(|(id, content)| ((*id).to_string(), Some((*content).to_string())))
                .collect(),
        ));
        self
    }

    pub fn with_unreadable_file(mut self, project_id: &str, file_id: &str) -> Self {
        let project = self
            .projects
            .iter_mut()
            .find(|(id, _)| id == project_id)
            .expect("project must exist before marking files unreadable");
        project.1.push((file_id.to_string(), None));
        self
    }

    fn project(&self, project_id: &str) -> Result<&Vec<(String, Option<String>)>, NoteStoreError> {
        self.projects
            .iter()
            .find(|(id, _)| id == project_id)
            .map(|(_, files)| files)
            .ok_or_else(|| NoteStoreError::ProjectNotFound {
                project_id: project_id.to_string(),
            })
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list_files(&self, project_id: &str) -> Result<Vec<String>, NoteStoreError> {
        Ok(self
            .project(project_id)?
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn read_file(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<NoteFile, NoteStoreError> {
        let files = self.project(project_id)?;
        let (_, content) = files
            .iter()
            .find(|(id, _)| id == file_id)
            .ok_or_else(|| NoteStoreError::FileUnreadable {
                file_id: file_id.to_string(),
                reason: "no such file".to_string(),
            })?;
        let content = content.clone().ok_or_else(|| NoteStoreError::FileUnreadable {
            file_id: file_id.to_string(),
            reason: "marked unreadable".to_string(),
        })?;
        Ok(NoteFile {
            path: format!("{project_id}/{file_id}.md"),
            content,
            modified_at: chrono::Utc::now(),
        })
    }
}

/// A classifier verdict in the JSON shape the production prompt asks for.
pub fn classifier_json(query_type: &str, keywords: Option<&[&str]>) -> String {
    match keywords {
        Some(keywords) => serde_json::json!({
            "query_type": query_type,
            "keywords": keywords,
        })
        .to_string(),
        None => serde_json::json!({ "query_type": query_type }).to_string(),
    }
}

/// Compile the production graph with one shared model double.
pub fn graph_with(model: Arc<dyn LanguageModel>, notes: MemoryNoteStore) -> WorkflowGraph {
    standard_graph(
        Arc::clone(&model),
        model,
        Arc::new(notes),
        Arc::new(TemplateCatalog::builtin()),
    )
    .expect("standard graph compiles")
}

/// Engine over an in-memory store, returning the store for inspection.
pub fn engine_with(
    model: Arc<dyn LanguageModel>,
    notes: MemoryNoteStore,
) -> (WorkflowEngine, Arc<InMemoryCheckpointStore>) {
    let store = Arc::new(InMemoryCheckpointStore::new());
    let engine = WorkflowEngine::new(
        graph_with(model, notes),
        Arc::clone(&store) as Arc<dyn CheckpointStore>,
    );
    (engine, store)
}

/// Assert the log ends with exactly one `final` event and nothing follows
/// it.
pub fn assert_single_trailing_final(events: &[OutputEvent]) {
    let finals: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == EventKind::Final)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(finals.len(), 1, "expected exactly one final event: {events:?}");
    assert_eq!(
        finals[0],
        events.len() - 1,
        "final event must be last: {events:?}"
    );
}
