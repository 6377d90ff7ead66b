//! The per-message pipeline.
//!
//! For every triggered message: extract facts, gather context, assemble the
//! system prompt, call the model, then do the bookkeeping. Every fallible
//! side step (fact storage, stats) is best-effort — only the model call
//! itself can fail the reply, and that failure turns into a fixed apology
//! rather than an error surfaced to the chat.

use crate::assembler::{assemble_system, ContextBlocks};
use bumblebot_context::{ChatStatsStore, GroupContextTracker};
use bumblebot_core::channel::ChannelMessage;
use bumblebot_core::message::Role;
use bumblebot_core::provider::{ChatRequest, Provider};
use bumblebot_memory::BotMemory;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Sent when the model call fails for any reason.
pub const APOLOGY: &str =
    "Извините, произошла ошибка при обработке запроса. Пожалуйста, попробуйте позже.";

/// Dialogue turns rendered into the private-chat context.
const DIALOGUE_WINDOW: usize = 5;

/// Runs the reply pipeline for triggered messages.
pub struct MessageHandler {
    memory: Arc<BotMemory>,
    tracker: Arc<GroupContextTracker>,
    stats: Option<Arc<ChatStatsStore>>,
    provider: Arc<dyn Provider>,
    persona: String,
    bot_name: String,
}

impl MessageHandler {
    pub fn new(
        memory: Arc<BotMemory>,
        tracker: Arc<GroupContextTracker>,
        stats: Option<Arc<ChatStatsStore>>,
        provider: Arc<dyn Provider>,
        persona: impl Into<String>,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            memory,
            tracker,
            stats,
            provider,
            persona: persona.into(),
            bot_name: bot_name.into(),
        }
    }

    /// Produce the reply for one triggered message.
    ///
    /// `query` is the trigger-stripped text and is what the model answers;
    /// extraction and group recording see the raw `message.text`. Always
    /// returns something sendable.
    pub async fn handle(&self, message: &ChannelMessage, query: &str) -> String {
        let user_id = message.sender_id;
        self.memory
            .extract_facts_from_message(user_id, &message.text)
            .await;

        let fact_context = match self.memory.get_user_context(user_id).await {
            Ok(context) => context,
            Err(e) => {
                warn!(user_id, "Fact lookup failed, replying without facts: {e}");
                String::new()
            }
        };

        let mut blocks = ContextBlocks {
            fact_context,
            reply_quote: message
                .reply_to
                .as_ref()
                .filter(|r| r.from_bot)
                .map(|r| r.text.clone()),
            ..Default::default()
        };

        if message.is_group {
            let combined = self
                .tracker
                .combined_context(
                    message.chat_id,
                    user_id,
                    &message.sender_name,
                    &message.text,
                )
                .await;
            blocks.group_context = combined.full_context;
        } else {
            self.memory.add_to_short_term(user_id, Role::User, query).await;
            blocks.conversation_context = self
                .memory
                .get_conversation_context(user_id, DIALOGUE_WINDOW)
                .await;
        }

        if let Some(stats) = &self.stats {
            let stats = Arc::clone(stats);
            let (chat_id, user_name) = (message.chat_id, message.sender_name.clone());
            tokio::spawn(async move {
                if let Err(e) = stats.record_message(chat_id, user_id, &user_name).await {
                    warn!(chat_id, user_id, "Stats upsert failed: {e}");
                }
            });
        }

        let system = assemble_system(&self.persona, &blocks);
        let request = ChatRequest::new(system, query);

        match self.provider.chat(request).await {
            Ok(response) => {
                info!(
                    user_id,
                    chat_id = message.chat_id,
                    model = %response.model,
                    "Reply generated"
                );
                if message.is_group {
                    self.tracker
                        .add_message(
                            message.chat_id,
                            user_id,
                            &self.bot_name,
                            &response.text,
                            true,
                        )
                        .await;
                } else {
                    self.memory
                        .add_to_short_term(user_id, Role::Assistant, &response.text)
                        .await;
                }
                response.text
            }
            Err(e) => {
                error!(user_id, chat_id = message.chat_id, "Model call failed: {e}");
                APOLOGY.to_string()
            }
        }
    }
}
