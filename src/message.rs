use serde::{Deserialize, Serialize};

/// A single conversation-history entry with a role and text content.
///
/// Messages carry the prior turns of a thread into prompt construction.
/// Within a run the history is read-only; the caller appends to it between
/// turns.
///
/// # Examples
///
/// ```
/// use noteflow::message::Message;
///
/// let user_msg = Message::user("What's in my biology notes?");
/// let assistant_msg = Message::assistant("Your notes cover cell respiration.");
///
/// assert!(user_msg.has_role(Message::USER));
/// assert!(!assistant_msg.has_role(Message::USER));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The text content of the message.
    pub content: String,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// Assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Render a history slice for interpolation into a prompt template.
///
/// One `role: content` line per entry; the literal `"None"` when the history
/// is empty, matching the sentinel used for absent optional context.
#[must_use]
pub fn render_history(history: &[Message]) -> String {
    if history.is_empty() {
        return "None".to_string();
    }
    history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
