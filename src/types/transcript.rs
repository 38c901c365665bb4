use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Message, MessageRole};

/// The ordered list of messages in a conversation.
///
/// Messages are only ever appended; the sole in-place mutation is replacing the
/// trailing assistant message while its response streams in.  The transcript
/// serializes as a bare JSON array of `{role, content}` objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replaces the trailing assistant message wholesale.
    ///
    /// Returns false and leaves the transcript untouched when the last message is
    /// missing or was not written by the assistant.
    pub fn replace_last_assistant(&mut self, content: impl Into<String>) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.role == MessageRole::Assistant => {
                *last = Message::assistant(content);
                true
            }
            _ => false,
        }
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The messages in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Serializes to the persisted JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the persisted JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Deref for Transcript {
    type Target = [Message];

    fn deref(&self) -> &[Message] {
        &self.messages
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_is_a_bare_array() {
        let transcript = Transcript::from(vec![Message::user("Hello"), Message::assistant("Hi")]);
        assert_eq!(
            transcript.to_json().unwrap(),
            r#"[{"role":"user","content":"Hello"},{"role":"assistant","content":"Hi"}]"#
        );
    }

    #[test]
    fn transcript_parses_persisted_form() {
        let transcript =
            Transcript::from_json(r#"[{"role":"user","content":"Hello"}]"#).unwrap();
        assert_eq!(transcript.messages(), &[Message::user("Hello")]);
    }

    #[test]
    fn transcript_rejects_malformed_json() {
        assert!(Transcript::from_json("{not json").is_err());
        assert!(Transcript::from_json(r#"{"role":"user"}"#).is_err());
    }

    #[test]
    fn replace_last_assistant_swaps_whole_message() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("Hello"));
        transcript.push(Message::placeholder());

        assert!(transcript.replace_last_assistant("Hi"));
        assert!(transcript.replace_last_assistant("Hi there"));
        assert_eq!(
            transcript.messages(),
            &[Message::user("Hello"), Message::assistant("Hi there")]
        );
    }

    #[test]
    fn replace_last_assistant_refuses_user_tail() {
        let mut transcript = Transcript::new();
        assert!(!transcript.replace_last_assistant("x"));
        transcript.push(Message::user("Hello"));
        assert!(!transcript.replace_last_assistant("x"));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn clear_empties() {
        let mut transcript = Transcript::from(vec![Message::user("a"), Message::assistant("b")]);
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
