//! Final response generation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::event::OutputEvent;
use crate::llm::LanguageModel;
use crate::message::render_history;
use crate::node::{Node, NodeContext, NodeError, NodeOutcome, NodePartial};
use crate::prompts::{PromptRenderer, TemplateName};
use crate::state::StateSnapshot;

/// Produces the final answer, grounded in found note content when search
/// surfaced any, from general knowledge otherwise.
///
/// Terminal on the search and general paths; emits exactly one `final`
/// event carrying the raw model text.
pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptRenderer>,
}

impl ResponseGenerator {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptRenderer>) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node for ResponseGenerator {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let history = render_history(&snapshot.conversation_history);
        let common = [
            ("user_message", snapshot.user_message.as_str()),
            ("conversation_history", history.as_str()),
            ("active_file_content", snapshot.active_file_or_sentinel()),
            ("highlighted_text", snapshot.highlighted_or_sentinel()),
        ];

        let user = if snapshot.file_contents.is_empty() {
            self.prompts
                .render(TemplateName::GeneralResponseUser, &common)?
        } else {
            let mut vars = common.to_vec();
            vars.push(("file_contents", snapshot.file_contents.as_str()));
            self.prompts.render(TemplateName::ContextResponseUser, &vars)?
        };
        let system = self
            .prompts
            .render(TemplateName::ResponseGenerationSystem, &[])?;

        let answer = self.model.complete(&system, &user).await?;

        Ok(NodeOutcome::advance(
            NodePartial::new().with_event(OutputEvent::final_answer(answer)),
        ))
    }
}
