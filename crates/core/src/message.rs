//! Message domain types.
//!
//! Two histories flow through the system: the private dialogue between one
//! user and the assistant ([`DialogueTurn`]), and the shared history of a
//! group chat ([`GroupMessage`]). Both live in bounded in-memory buffers —
//! nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

/// A single turn in a user's private dialogue with the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub text: String,

    /// When the turn happened
    pub timestamp: DateTime<Utc>,
}

impl DialogueTurn {
    /// Create a user turn timestamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn timestamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A message observed in a group chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Telegram user ID of the author
    pub user_id: i64,

    /// Display name of the author
    pub user_name: String,

    /// The text content
    pub text: String,

    /// When the message was observed
    pub timestamp: DateTime<Utc>,

    /// Whether this message was produced by the bot itself
    pub is_bot: bool,
}

/// Truncate a message body for context rendering.
///
/// Counts characters, not bytes — bodies are routinely Cyrillic.
/// Appends `...` exactly as the rendered transcripts expect.
pub fn truncate_body(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialogue_turn_constructors() {
        let u = DialogueTurn::user("привет");
        assert_eq!(u.role, Role::User);
        assert_eq!(u.text, "привет");

        let a = DialogueTurn::assistant("здравствуйте");
        assert_eq!(a.role, Role::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        // 6 Cyrillic chars = 12 bytes; truncating at 4 chars must not panic
        assert_eq!(truncate_body("привет", 4), "прив...");
        assert_eq!(truncate_body("hi", 100), "hi...");
    }
}
