//! Note content drafting.

use std::sync::Arc;

use async_trait::async_trait;

use crate::event::OutputEvent;
use crate::llm::LanguageModel;
use crate::message::render_history;
use crate::node::{Node, NodeContext, NodeError, NodeOutcome, NodePartial};
use crate::prompts::{PromptRenderer, TemplateName};
use crate::state::StateSnapshot;

/// Drafts note content into `pending_note_edit`.
///
/// Nothing is committed to note storage here; the draft waits for the
/// consent gate. Never terminal by itself.
pub struct NoteGenerator {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptRenderer>,
}

impl NoteGenerator {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptRenderer>) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node for NoteGenerator {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let history = render_history(&snapshot.conversation_history);
        let user = self.prompts.render(
            TemplateName::NoteGenerationUser,
            &[
                ("user_message", snapshot.user_message.as_str()),
                ("conversation_history", history.as_str()),
                ("highlighted_text", snapshot.highlighted_or_sentinel()),
            ],
        )?;
        let system = self.prompts.render(TemplateName::NoteGenerationSystem, &[])?;

        let draft = self.model.complete(&system, &user).await?;

        Ok(NodeOutcome::advance(
            NodePartial::new()
                .with_pending_note_edit(draft)
                .with_event(OutputEvent::step("Note content generated.")),
        ))
    }
}
