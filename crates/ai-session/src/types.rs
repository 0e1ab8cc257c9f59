//! Chat transcript types.

use ai_types::{Message, Role};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// A named, persisted chat conversation.
///
/// The system prompt is not part of the transcript; callers prepend it
/// when building a request (see [`ChatSession::request_messages`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    pub model: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatSession {
    /// Create an empty chat.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: Utc::now(),
            model: model.into(),
            messages: Vec::new(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Remove a trailing user message that never got an answer.
    /// Returns the removed text.
    pub fn pop_unanswered(&mut self) -> Option<String> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => self.messages.pop().map(|m| m.content),
            _ => None,
        }
    }

    /// The transcript with `system_prompt` in front, ready for a request.
    pub fn request_messages(&self, system_prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend(self.messages.iter().cloned());
        messages
    }

    /// Number of completed user/assistant exchanges.
    pub fn exchange_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// First user message, shortened for listings.
    pub fn preview(&self) -> String {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| {
                let trimmed = m.content.trim();
                if trimmed.chars().count() > 60 {
                    format!("{}...", truncate_chars(trimmed, 57))
                } else {
                    trimmed.to_string()
                }
            })
            .unwrap_or_default()
    }

    pub fn to_summary(&self) -> ChatSummary {
        ChatSummary {
            name: self.name.clone(),
            created: self.created,
            model: self.model.clone(),
            message_count: self.messages.len(),
            preview: self.preview(),
        }
    }
}

/// Lightweight summary for `/list`.
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub name: String,
    pub created: DateTime<Utc>,
    pub model: String,
    pub message_count: usize,
    pub preview: String,
}

impl ChatSummary {
    /// Creation time in local time, e.g. "2025-03-14 09:26".
    pub fn created_local(&self) -> String {
        self.created
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Default name for a new chat: `chat-YYYYMMDD-HHMMSS` in local time.
pub fn generate_name() -> String {
    format!("chat-{}", Local::now().format("%Y%m%d-%H%M%S"))
}

/// Chat names become file names, so they must stay inside the store.
pub fn validate_name(name: &str) -> Result<(), SessionError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("name contains a path separator")
    } else if name.contains("..") {
        Some("name contains '..'")
    } else if name.starts_with('.') {
        Some("name starts with '.'")
    } else if name.chars().any(char::is_control) {
        Some("name contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SessionError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_unanswered_removes_trailing_user_message() {
        let mut chat = ChatSession::new("c", "m");
        chat.push_user("q1");
        chat.push_assistant("a1");
        chat.push_user("q2");
        assert_eq!(chat.pop_unanswered().as_deref(), Some("q2"));
        assert_eq!(chat.messages.len(), 2);
        // Last message is now the assistant's; nothing to remove.
        assert!(chat.pop_unanswered().is_none());
        assert_eq!(chat.messages.len(), 2);
    }

    #[test]
    fn request_messages_prepends_system_prompt() {
        let mut chat = ChatSession::new("c", "m");
        chat.push_user("hi");
        let messages = chat.request_messages("be helpful");
        assert_eq!(messages[0], Message::system("be helpful"));
        assert_eq!(messages[1], Message::user("hi"));
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn exchange_count_counts_answers() {
        let mut chat = ChatSession::new("c", "m");
        chat.push_user("q1");
        chat.push_assistant("a1");
        chat.push_user("q2");
        assert_eq!(chat.exchange_count(), 1);
    }

    #[test]
    fn preview_truncates_with_unicode_safety() {
        let mut chat = ChatSession::new("c", "m");
        chat.push_user("\u{1F600}".repeat(82));
        let preview = chat.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 60);
    }

    #[test]
    fn preview_empty_without_user_messages() {
        assert_eq!(ChatSession::new("c", "m").preview(), "");
    }

    #[test]
    fn generated_name_shape() {
        let name = generate_name();
        assert!(name.starts_with("chat-"));
        assert_eq!(name.len(), "chat-20250101-120000".len());
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn invalid_names() {
        for bad in ["", "  ", "a/b", "a\\b", "..", "x..y", ".hidden"] {
            assert!(
                matches!(validate_name(bad), Err(SessionError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_name("project-notes_2").is_ok());
    }

    #[test]
    fn deserialize_without_created() {
        let json = r#"{"name":"old","model":"m","messages":[{"role":"user","content":"hi"}]}"#;
        let chat: ChatSession = serde_json::from_str(json).unwrap();
        assert_eq!(chat.name, "old");
        assert_eq!(chat.messages.len(), 1);
    }
}
