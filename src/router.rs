//! Deterministic routing between nodes.
//!
//! The graph topology is fixed: classification fans out to one of three
//! paths, search always feeds response generation, note generation always
//! feeds the consent gate. Both functions here are pure and total: every
//! enum value maps to exactly one answer and nothing can panic, so routing
//! can never leave a run undefined.

use crate::state::QueryType;
use crate::types::NodeKind;

/// Map a classified query type to the node that handles it.
///
/// `Unset` should not occur after classification; it falls through to the
/// general-answer path rather than failing the run.
#[must_use]
pub fn route(query_type: QueryType) -> NodeKind {
    match query_type {
        QueryType::AddToNote => NodeKind::NoteGenerator,
        QueryType::Search => NodeKind::NoteSearch,
        QueryType::General | QueryType::Unset => NodeKind::ResponseGenerator,
    }
}

/// The node that follows `node` in the fixed topology, or `None` when the
/// node is terminal.
///
/// `query_type` only influences the classifier's successor; every other
/// edge is unconditional.
#[must_use]
pub fn successor(node: NodeKind, query_type: QueryType) -> Option<NodeKind> {
    match node {
        NodeKind::Classifier => Some(route(query_type)),
        NodeKind::NoteSearch => Some(NodeKind::ResponseGenerator),
        NodeKind::NoteGenerator => Some(NodeKind::ConsentGate),
        NodeKind::ResponseGenerator | NodeKind::ConsentGate => None,
    }
}
