//! Channel trait — the abstraction over the chat platform.
//!
//! A Channel connects Bumblebot to a messaging platform (Telegram in
//! production). It receives messages from users and sends responses back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Context about the message this one replies to, when it replies to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyContext {
    /// Whether the replied-to message was authored by the bot.
    pub from_bot: bool,

    /// Text of the replied-to message.
    pub text: String,
}

/// A message received from the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Chat this message belongs to (negative IDs are Telegram groups).
    pub chat_id: i64,

    /// Platform user ID of the sender.
    pub sender_id: i64,

    /// Display name of the sender.
    pub sender_name: String,

    /// The raw text content, trigger mention included.
    pub text: String,

    /// Whether the chat is a group (vs a private dialogue).
    pub is_group: bool,

    /// Set when this message replies to another message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyContext>,
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic, message
/// formatting, and authorization.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram").
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    ///
    /// Returns a receiver that yields incoming messages. The channel
    /// implementation handles polling or webhooks internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send a response message to a specific chat.
    async fn send(&self, chat_id: i64, content: &str) -> std::result::Result<(), ChannelError>;

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: i64) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Check if a chat is allowed (allowlist check).
    fn is_allowed(&self, chat_id: i64) -> bool;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_message_roundtrip() {
        let msg = ChannelMessage {
            chat_id: -100123,
            sender_id: 42,
            sender_name: "Алиса".into(),
            text: "@shmel_bot привет".into(),
            is_group: true,
            reply_to: Some(ReplyContext {
                from_bot: true,
                text: "Чем могу помочь?".into(),
            }),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ChannelMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chat_id, -100123);
        assert!(back.reply_to.unwrap().from_bot);
    }

    #[test]
    fn reply_to_omitted_when_absent() {
        let msg = ChannelMessage {
            chat_id: 1,
            sender_id: 2,
            sender_name: "Боб".into(),
            text: "привет".into(),
            is_group: false,
            reply_to: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("reply_to"));
    }
}
