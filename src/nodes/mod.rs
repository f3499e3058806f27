//! The five node implementations of the workflow graph.
//!
//! Each node owns exactly the collaborators it needs and nothing else; the
//! engine wires them together via [`standard_graph`].

pub mod classifier;
pub mod consent;
pub mod note;
pub mod respond;
pub mod search;

pub use classifier::QueryClassifier;
pub use consent::ConsentGate;
pub use note::NoteGenerator;
pub use respond::ResponseGenerator;
pub use search::NoteSearch;

use std::sync::Arc;

use crate::graph::{GraphError, WorkflowGraph};
use crate::llm::LanguageModel;
use crate::notes::NoteStore;
use crate::prompts::PromptRenderer;
use crate::types::NodeKind;

/// Wire the production node set into a compiled graph.
///
/// `fast` serves classification; `deep` serves response and note
/// generation.
pub fn standard_graph(
    fast: Arc<dyn LanguageModel>,
    deep: Arc<dyn LanguageModel>,
    store: Arc<dyn NoteStore>,
    prompts: Arc<dyn PromptRenderer>,
) -> Result<WorkflowGraph, GraphError> {
    WorkflowGraph::builder()
        .add_node(
            NodeKind::Classifier,
            QueryClassifier::new(fast, Arc::clone(&prompts)),
        )
        .add_node(NodeKind::NoteSearch, NoteSearch::new(store))
        .add_node(
            NodeKind::ResponseGenerator,
            ResponseGenerator::new(Arc::clone(&deep), Arc::clone(&prompts)),
        )
        .add_node(NodeKind::NoteGenerator, NoteGenerator::new(deep, prompts))
        .add_node(NodeKind::ConsentGate, ConsentGate)
        .compile()
}
