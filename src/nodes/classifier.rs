//! Query classification node.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::event::OutputEvent;
use crate::llm::LanguageModel;
use crate::message::render_history;
use crate::node::{Node, NodeContext, NodeError, NodeOutcome, NodePartial};
use crate::prompts::{PromptRenderer, TemplateName};
use crate::state::{QueryType, StateSnapshot};

/// Expected structure of the classifier model's JSON reply.
#[derive(Debug, Deserialize)]
struct ClassifierVerdict {
    #[serde(default)]
    query_type: String,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

/// Classifies the user message and seeds the search query.
///
/// The model is asked for a JSON verdict; a reply that cannot be parsed
/// into the expected structure **fails soft** to [`QueryType::General`].
/// A malformed classification must never abort the run; only a provider
/// failure is terminal here.
pub struct QueryClassifier {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptRenderer>,
}

impl QueryClassifier {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptRenderer>) -> Self {
        Self { model, prompts }
    }

    fn fallback() -> NodePartial {
        NodePartial::new()
            .with_query_type(QueryType::General)
            .with_event(OutputEvent::step("Let me think about that for a bit."))
    }
}

#[async_trait]
impl Node for QueryClassifier {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let system = self.prompts.render(TemplateName::QueryAnalysisSystem, &[])?;
        let history = render_history(&snapshot.conversation_history);
        let user = self.prompts.render(
            TemplateName::QueryAnalysisUser,
            &[
                ("user_message", snapshot.user_message.as_str()),
                ("conversation_history", history.as_str()),
                ("highlighted_text", snapshot.highlighted_or_sentinel()),
            ],
        )?;

        let reply = self.model.complete(&system, &user).await?;

        let Ok(verdict) = serde_json::from_str::<ClassifierVerdict>(reply.trim()) else {
            tracing::debug!(reply_len = reply.len(), "unparseable classifier reply");
            return Ok(NodeOutcome::advance(Self::fallback()));
        };
        let Some(query_type) = QueryType::parse(&verdict.query_type) else {
            tracing::debug!(label = %verdict.query_type, "unknown query type label");
            return Ok(NodeOutcome::advance(Self::fallback()));
        };

        let partial = match query_type {
            QueryType::Search => {
                let search_query = match verdict.keywords {
                    Some(keywords) if !keywords.is_empty() => keywords.join(","),
                    _ => snapshot.user_message.clone(),
                };
                NodePartial::new()
                    .with_query_type(query_type)
                    .with_search_query(search_query)
                    .with_event(OutputEvent::step("Searching your project files..."))
            }
            QueryType::AddToNote => NodePartial::new().with_query_type(query_type).with_event(
                OutputEvent::step("Let me generate some information for your note..."),
            ),
            QueryType::General | QueryType::Unset => Self::fallback(),
        };

        Ok(NodeOutcome::advance(partial))
    }
}
