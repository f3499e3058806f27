//! Core identity types for the workflow graph.
//!
//! The node set is closed: every node the engine can execute is a variant of
//! [`NodeKind`], so routing and successor lookups are exhaustive matches the
//! compiler checks. The string `encode`/`decode` forms exist only for
//! persistence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within the workflow graph.
///
/// # Persistence
///
/// `NodeKind` round-trips through a human-readable string form via
/// [`encode`](Self::encode) and [`decode`](Self::decode), which checkpoint
/// backends use to store the resume position.
///
/// ```
/// use noteflow::types::NodeKind;
///
/// let kind = NodeKind::ConsentGate;
/// assert_eq!(NodeKind::decode(&kind.encode()), Some(kind));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Classifies the user message into a query type.
    Classifier,
    /// Keyword search over the project's note files.
    NoteSearch,
    /// Produces the final answer; terminal on the search and general paths.
    ResponseGenerator,
    /// Drafts note content pending approval.
    NoteGenerator,
    /// Suspends the run until the user approves or cancels the note edit.
    ConsentGate,
}

impl NodeKind {
    /// All nodes, in no particular execution order. Used by graph validation.
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Classifier,
        NodeKind::NoteSearch,
        NodeKind::ResponseGenerator,
        NodeKind::NoteGenerator,
        NodeKind::ConsentGate,
    ];

    /// Encode into the persisted string form.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            NodeKind::Classifier => "Classifier",
            NodeKind::NoteSearch => "NoteSearch",
            NodeKind::ResponseGenerator => "ResponseGenerator",
            NodeKind::NoteGenerator => "NoteGenerator",
            NodeKind::ConsentGate => "ConsentGate",
        }
    }

    /// Decode a persisted string form. Unknown strings yield `None`; the
    /// node set is closed, so there is no forward-compatibility fallback.
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "Classifier" => Some(NodeKind::Classifier),
            "NoteSearch" => Some(NodeKind::NoteSearch),
            "ResponseGenerator" => Some(NodeKind::ResponseGenerator),
            "NoteGenerator" => Some(NodeKind::NoteGenerator),
            "ConsentGate" => Some(NodeKind::ConsentGate),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::decode(kind.encode()), Some(kind));
        }
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert_eq!(NodeKind::decode("Custom:Whatever"), None);
        assert_eq!(NodeKind::decode(""), None);
    }
}
