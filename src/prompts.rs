//! Prompt templates and rendering.
//!
//! Template text is a replaceable input, not part of the engine contract;
//! nodes only depend on the [`PromptRenderer`] trait and the closed
//! [`TemplateName`] set. [`TemplateCatalog`] is the default implementation:
//! it ships built-in template text and can be overridden per template from a
//! directory of `<name>.txt` files.

use std::path::Path;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// The closed set of templates the nodes render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateName {
    QueryAnalysisSystem,
    QueryAnalysisUser,
    ContextResponseUser,
    GeneralResponseUser,
    ResponseGenerationSystem,
    NoteGenerationUser,
    NoteGenerationSystem,
}

impl TemplateName {
    pub const ALL: [TemplateName; 7] = [
        TemplateName::QueryAnalysisSystem,
        TemplateName::QueryAnalysisUser,
        TemplateName::ContextResponseUser,
        TemplateName::GeneralResponseUser,
        TemplateName::ResponseGenerationSystem,
        TemplateName::NoteGenerationUser,
        TemplateName::NoteGenerationSystem,
    ];

    /// File stem used when loading overrides from a directory.
    #[must_use]
    pub fn file_stem(&self) -> &'static str {
        match self {
            TemplateName::QueryAnalysisSystem => "query_analysis_system",
            TemplateName::QueryAnalysisUser => "query_analysis_user",
            TemplateName::ContextResponseUser => "context_response_user",
            TemplateName::GeneralResponseUser => "general_response_user",
            TemplateName::ResponseGenerationSystem => "response_generation_system",
            TemplateName::NoteGenerationUser => "note_generation_user",
            TemplateName::NoteGenerationSystem => "note_generation_system",
        }
    }
}

/// Renders a named template with `{placeholder}` variables.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, template: TemplateName, vars: &[(&str, &str)]) -> Result<String, PromptError>;
}

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("template {0:?} references unknown placeholder {{{1}}}")]
    #[diagnostic(
        code(noteflow::prompts::unknown_placeholder),
        help("Pass the variable when rendering, or fix the template text.")
    )]
    UnknownPlaceholder(TemplateName, String),

    #[error("failed to load template override {path}: {message}")]
    #[diagnostic(code(noteflow::prompts::load))]
    Load { path: String, message: String },
}

/// Default renderer: built-in template text plus optional per-template
/// directory overrides.
#[derive(Clone, Debug)]
pub struct TemplateCatalog {
    templates: FxHashMap<TemplateName, String>,
}

impl TemplateCatalog {
    /// Catalog with the built-in template text.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = FxHashMap::default();
        for name in TemplateName::ALL {
            templates.insert(name, builtin_text(name).to_string());
        }
        Self { templates }
    }

    /// Built-in catalog with overrides loaded from `<dir>/<stem>.txt` where
    /// present. Missing files keep the built-in text; unreadable files are
    /// an error.
    pub fn with_overrides(dir: impl AsRef<Path>) -> Result<Self, PromptError> {
        let mut catalog = Self::builtin();
        for name in TemplateName::ALL {
            let path = dir.as_ref().join(format!("{}.txt", name.file_stem()));
            if path.exists() {
                let text = std::fs::read_to_string(&path).map_err(|e| PromptError::Load {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                catalog.templates.insert(name, text);
            }
        }
        Ok(catalog)
    }
}

impl PromptRenderer for TemplateCatalog {
    fn render(&self, template: TemplateName, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let text = self
            .templates
            .get(&template)
            .expect("catalog holds every template name");
        substitute(template, text, vars)
    }
}

/// Single-pass `{placeholder}` substitution.
///
/// Only `{ident}` tokens (lowercase, digits, underscores) are placeholders;
/// any other brace sequence (e.g. a JSON example in the template text) is
/// copied verbatim. An ident-shaped placeholder with no matching variable is
/// an error. Substituted values are inserted verbatim and never re-expanded.
fn substitute(
    template: TemplateName,
    text: &str,
    vars: &[(&str, &str)],
) -> Result<String, PromptError> {
    fn is_ident_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let ident_len = after.chars().take_while(|c| is_ident_char(*c)).count();
        let is_placeholder = ident_len > 0 && after[ident_len..].starts_with('}');
        if !is_placeholder {
            out.push('{');
            rest = after;
            continue;
        }
        let key = &after[..ident_len];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => return Err(PromptError::UnknownPlaceholder(template, key.to_string())),
        }
        rest = &after[ident_len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn builtin_text(name: TemplateName) -> &'static str {
    match name {
        TemplateName::QueryAnalysisSystem => {
            "You are a query classifier for a note-taking assistant.\n\
             Classify the user's message into exactly one of:\n\
             - SEARCH: the answer should be grounded in the user's note files\n\
             - ADD_TO_NOTE: the user wants content drafted into a note\n\
             - GENERAL: answer from general knowledge\n\
             Reply with a single JSON object: {\"query_type\": \"...\"} and, for\n\
             SEARCH, an optional \"keywords\" array of short search terms.\n\
             Output only the JSON object, nothing else."
        }
        TemplateName::QueryAnalysisUser => {
            "User message:\n{user_message}\n\n\
             Conversation so far:\n{conversation_history}\n\n\
             Highlighted text:\n{highlighted_text}"
        }
        TemplateName::ContextResponseUser => {
            "Answer the user's question using the note excerpts below.\n\n\
             Notes:\n{file_contents}\n\n\
             User message:\n{user_message}\n\n\
             Conversation so far:\n{conversation_history}\n\n\
             Currently open file:\n{active_file_content}\n\n\
             Highlighted text:\n{highlighted_text}"
        }
        TemplateName::GeneralResponseUser => {
            "Answer the user's question from your own knowledge.\n\n\
             User message:\n{user_message}\n\n\
             Conversation so far:\n{conversation_history}\n\n\
             Currently open file:\n{active_file_content}\n\n\
             Highlighted text:\n{highlighted_text}"
        }
        TemplateName::ResponseGenerationSystem => {
            "You are a patient tutor helping a student with their study notes.\n\
             Be concise, accurate, and cite the note file names when you draw\n\
             on them."
        }
        TemplateName::NoteGenerationUser => {
            "Draft note content for the user's request.\n\n\
             User message:\n{user_message}\n\n\
             Conversation so far:\n{conversation_history}\n\n\
             Highlighted text:\n{highlighted_text}"
        }
        TemplateName::NoteGenerationSystem => {
            "You write well-structured markdown note content. Produce only the\n\
             note body, ready to be inserted into the user's file."
        }
    }
}
