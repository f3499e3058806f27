//! The streaming output contract.
//!
//! Every observable result of a run is an [`OutputEvent`] appended to the
//! workflow state's event log and broadcast to stream subscribers in the
//! same order. The wire shape is one JSON object per event:
//!
//! ```json
//! {"type": "step", "content": "Searching your project files..."}
//! ```
//!
//! A suspended run hands the caller an [`Interrupt`] instead of further
//! events; the caller answers with a [`ResumeDecision`].

use serde::{Deserialize, Serialize};

/// Discriminates the kinds of events a run can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Intermediate progress notice.
    Step,
    /// Approved note content, emitted once per accepted note edit.
    Note,
    /// Terminal answer; exactly one per run, always last.
    Final,
    /// Consent request relayed onto the live stream while a run is suspended.
    Consent,
}

/// A single output event in the order-sensitive run log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub content: String,
}

impl OutputEvent {
    #[must_use]
    pub fn step(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Step,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn note(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Note,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn final_answer(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Final,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn consent(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Consent,
            content: content.into(),
        }
    }

    /// True for the terminal event kind.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.kind == EventKind::Final
    }

    /// Compact wire form, one JSON object per event.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Suspension payload handed to the caller when a run pauses for consent.
///
/// Transient by design: it exists between the suspending node's completion
/// and the corresponding resume call, and is never persisted on its own.
/// The serialized shape is `{"type": "note_consent", "message": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interrupt {
    #[serde(rename = "type")]
    pub kind: InterruptKind,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptKind {
    NoteConsent,
}

impl Interrupt {
    #[must_use]
    pub fn note_consent(message: impl Into<String>) -> Self {
        Self {
            kind: InterruptKind::NoteConsent,
            message: message.into(),
        }
    }

    /// The interrupt relayed as a stream event, for consumers that only
    /// observe the event stream.
    #[must_use]
    pub fn to_event(&self) -> OutputEvent {
        OutputEvent::consent(self.message.clone())
    }
}

/// The caller's answer to an [`Interrupt`].
///
/// The contract is deliberately binary and string-literal keyed: the exact
/// value `"approve"` approves, every other value (including empty) cancels.
/// No fuzzy matching.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeDecision {
    pub content: String,
}

impl ResumeDecision {
    /// The only content value treated as approval.
    pub const APPROVE: &'static str = "approve";

    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn approve() -> Self {
        Self::new(Self::APPROVE)
    }

    #[must_use]
    pub fn is_approval(&self) -> bool {
        self.content == Self::APPROVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_wire_shape() {
        let event = OutputEvent::step("Searching your project files...");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "step", "content": "Searching your project files..."})
        );
    }

    #[test]
    fn all_kinds_serialize_lowercase() {
        for (event, tag) in [
            (OutputEvent::step("s"), "step"),
            (OutputEvent::note("n"), "note"),
            (OutputEvent::final_answer("f"), "final"),
            (OutputEvent::consent("c"), "consent"),
        ] {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], tag);
        }
    }

    #[test]
    fn interrupt_wire_shape() {
        let interrupt = Interrupt::note_consent("Add this to your notes?");
        let value = serde_json::to_value(&interrupt).unwrap();
        assert_eq!(
            value,
            json!({"type": "note_consent", "message": "Add this to your notes?"})
        );
    }

    #[test]
    fn approval_is_exact_match() {
        assert!(ResumeDecision::approve().is_approval());
        assert!(!ResumeDecision::new("Approve").is_approval());
        assert!(!ResumeDecision::new("approve ").is_approval());
        assert!(!ResumeDecision::new("yes").is_approval());
        assert!(!ResumeDecision::new("").is_approval());
    }
}
