//! Provider trait — the abstraction over hosted LLM APIs.
//!
//! A Provider turns one assembled prompt (system content + user question)
//! into one reply. Conversation memory is *not* the provider's job: the
//! assembler folds recent history into the system content before the call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A single chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System instructions: persona plus injected context sections.
    pub system: String,

    /// The user's question (trigger text already stripped).
    pub user_message: String,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user_message: user_message.into(),
        }
    }
}

/// The model's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The reply text.
    pub text: String,

    /// Which model produced it (for logging).
    pub model: String,
}

/// The core Provider trait.
///
/// Implementations handle authentication, request shaping, and error mapping
/// for one hosted API.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Generate a reply for one request.
    async fn chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, ProviderError>;
}
