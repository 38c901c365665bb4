use serde::{Deserialize, Serialize};

/// A single entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: MessageRole,

    /// The message text.
    pub content: String,
}

/// Role type for a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl Message {
    /// Create a new `Message` with the given content and role.
    pub fn new(content: impl Into<String>, role: MessageRole) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user `Message`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, MessageRole::User)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, MessageRole::Assistant)
    }

    /// Create the empty assistant entry reserved while a response streams in.
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    /// Returns true if this is an assistant message with no content yet.
    pub fn is_placeholder(&self) -> bool {
        self.role == MessageRole::Assistant && self.content.is_empty()
    }
}

impl MessageRole {
    /// The label shown in front of a message of this role.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::User => "You",
            MessageRole::Assistant => "Assistant",
        }
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}
