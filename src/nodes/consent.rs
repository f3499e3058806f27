//! The consent gate: the one suspension point in the graph.

use async_trait::async_trait;

use crate::event::{Interrupt, OutputEvent};
use crate::node::{Node, NodeContext, NodeError, NodeOutcome, NodePartial};
use crate::state::StateSnapshot;

/// Holds a drafted note edit until the user explicitly approves it.
///
/// On first entry the gate suspends the run with a `note_consent`
/// interrupt. When the engine re-enters it with the caller's decision,
/// exactly one of two terminal outcomes happens:
///
/// - `"approve"` → a `note` event carrying the draft, then a success
///   `final` event;
/// - anything else → a cancellation `final` event only.
///
/// Either way `pending_note_edit` is cleared.
pub struct ConsentGate;

impl ConsentGate {
    fn consent_message(pending: &str) -> String {
        format!(
            "I've generated the following:\n{pending}\n===\nDo you want me to add this to your notes?"
        )
    }
}

#[async_trait]
impl Node for ConsentGate {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let Some(decision) = ctx.resume else {
            let interrupt = Interrupt::note_consent(Self::consent_message(
                &snapshot.pending_note_edit,
            ));
            return Ok(NodeOutcome::suspend(NodePartial::default(), interrupt));
        };

        let partial = if decision.is_approval() {
            NodePartial::new()
                .with_event(OutputEvent::note(snapshot.pending_note_edit.clone()))
                .with_event(OutputEvent::final_answer("Successfully edited note!"))
                .with_pending_note_edit("")
        } else {
            NodePartial::new()
                .with_event(OutputEvent::final_answer("Operation cancelled by user."))
                .with_pending_note_edit("")
        };

        Ok(NodeOutcome::advance(partial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, ResumeDecision};
    use crate::state::WorkflowState;
    use crate::types::NodeKind;

    fn snapshot_with_pending(pending: &str) -> StateSnapshot {
        let mut state = WorkflowState::builder().user_message("add this").build();
        state.pending_note_edit = pending.to_string();
        state.snapshot()
    }

    #[tokio::test]
    async fn first_entry_suspends_with_the_draft() {
        let ctx = NodeContext::new("t1", NodeKind::ConsentGate);
        let outcome = ConsentGate
            .run(snapshot_with_pending("draft body"), ctx)
            .await
            .unwrap();
        match outcome {
            NodeOutcome::Suspend { interrupt, partial } => {
                assert!(interrupt.message.contains("draft body"));
                assert!(partial.events.is_empty());
            }
            NodeOutcome::Advance(_) => panic!("expected suspension"),
        }
    }

    #[tokio::test]
    async fn approval_emits_note_then_final_and_clears() {
        let ctx =
            NodeContext::new("t1", NodeKind::ConsentGate).with_resume(ResumeDecision::approve());
        let outcome = ConsentGate
            .run(snapshot_with_pending("draft body"), ctx)
            .await
            .unwrap();
        let NodeOutcome::Advance(partial) = outcome else {
            panic!("expected advance");
        };
        let kinds: Vec<_> = partial.events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Note, EventKind::Final]);
        assert_eq!(partial.events[0].content, "draft body");
        assert_eq!(partial.pending_note_edit.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn any_other_decision_cancels() {
        for decision in ["reject", "", "APPROVE", "approve "] {
            let ctx = NodeContext::new("t1", NodeKind::ConsentGate)
                .with_resume(ResumeDecision::new(decision));
            let outcome = ConsentGate
                .run(snapshot_with_pending("draft body"), ctx)
                .await
                .unwrap();
            let NodeOutcome::Advance(partial) = outcome else {
                panic!("expected advance");
            };
            let kinds: Vec<_> = partial.events.iter().map(|e| e.kind).collect();
            assert_eq!(kinds, vec![EventKind::Final]);
            assert_eq!(partial.events[0].content, "Operation cancelled by user.");
            assert_eq!(partial.pending_note_edit.as_deref(), Some(""));
        }
    }
}
