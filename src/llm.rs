//! Language-model collaborator interface and provider selection.
//!
//! The model call itself is an external capability consumed through the
//! narrow [`LanguageModel`] trait; the engine never sees anything beyond
//! `complete(system, user) -> text`. What *is* owned here is the provider
//! precedence rule inherited from the original deployment: when both an
//! Anthropic and an OpenAI credential are configured, **Anthropic wins**.
//! That ordering is a documented configuration-precedence decision, not
//! something to re-derive per call site.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

/// Opaque completion capability.
///
/// Calls are synchronous from the engine's perspective: the executing node
/// blocks until the call returns or fails. There is no mid-call
/// cancellation; a caller disconnecting from the event stream does not
/// abort an in-flight completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt pair into raw text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

/// Errors from the model provider. Terminal for the run that hits them.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    #[error("no API key provided; set at least one LLM provider's API key in the environment")]
    #[diagnostic(
        code(noteflow::llm::no_credentials),
        help("Set ANTHROPIC_API_KEY or OPENAI_API_KEY.")
    )]
    NoCredentials,

    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(noteflow::llm::request))]
    Request {
        provider: &'static str,
        message: String,
    },
}

/// Which model weight class a node wants.
///
/// Classification runs on the fast tier; response and note generation run
/// on the deep tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Deep,
}

/// A configured model provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    /// Stable identifier used in error messages and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }

    /// The model name serving the given tier on this provider.
    #[must_use]
    pub fn model(&self, tier: ModelTier) -> &'static str {
        match (self, tier) {
            (Provider::Anthropic, ModelTier::Fast) => "claude-3-5-haiku-20241022",
            (Provider::Anthropic, ModelTier::Deep) => "claude-3-5-sonnet-20241022",
            (Provider::OpenAi, ModelTier::Fast) => "gpt-4o-mini",
            (Provider::OpenAi, ModelTier::Deep) => "gpt-4o",
        }
    }
}

/// Provider credentials, typically read from the environment.
#[derive(Clone, Debug, Default)]
pub struct ProviderSettings {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl ProviderSettings {
    /// Read credentials from `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`.
    ///
    /// Empty values count as absent.
    #[must_use]
    pub fn from_env() -> Self {
        fn non_empty(var: &str) -> Option<String> {
            std::env::var(var).ok().filter(|v| !v.is_empty())
        }
        Self {
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            openai_api_key: non_empty("OPENAI_API_KEY"),
        }
    }

    /// Select the provider to use. Anthropic takes precedence when both
    /// credentials are present.
    pub fn select(&self) -> Result<Provider, ProviderError> {
        if self.anthropic_api_key.is_some() {
            Ok(Provider::Anthropic)
        } else if self.openai_api_key.is_some() {
            Ok(Provider::OpenAi)
        } else {
            Err(ProviderError::NoCredentials)
        }
    }

    /// The API key for the selected provider.
    #[must_use]
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(anthropic: Option<&str>, openai: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            anthropic_api_key: anthropic.map(str::to_string),
            openai_api_key: openai.map(str::to_string),
        }
    }

    #[test]
    fn anthropic_wins_when_both_configured() {
        let s = settings(Some("sk-ant"), Some("sk-oai"));
        assert_eq!(s.select().unwrap(), Provider::Anthropic);
    }

    #[test]
    fn openai_is_the_fallback() {
        let s = settings(None, Some("sk-oai"));
        assert_eq!(s.select().unwrap(), Provider::OpenAi);
    }

    #[test]
    fn no_credentials_is_an_error() {
        let s = settings(None, None);
        assert!(matches!(s.select(), Err(ProviderError::NoCredentials)));
    }

    #[test]
    fn tiers_map_to_model_names() {
        assert_eq!(
            Provider::Anthropic.model(ModelTier::Fast),
            "claude-3-5-haiku-20241022"
        );
        assert_eq!(
            Provider::Anthropic.model(ModelTier::Deep),
            "claude-3-5-sonnet-20241022"
        );
        assert_eq!(Provider::OpenAi.model(ModelTier::Fast), "gpt-4o-mini");
        assert_eq!(Provider::OpenAi.model(ModelTier::Deep), "gpt-4o");
    }
}
