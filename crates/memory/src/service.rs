//! The memory facade the message handler talks to.
//!
//! [`BotMemory`] composes the durable fact store, the short-term dialogue
//! buffer, and the fact extractor behind one interface. Fact extraction is
//! best-effort: a storage failure is logged and swallowed so a broken disk
//! never breaks the conversation.

use crate::short_term::ShortTermBuffer;
use bumblebot_core::error::MemoryError;
use bumblebot_core::facts::{FactExtractor, FactMap, FactStore};
use bumblebot_core::message::Role;
use std::sync::Arc;
use tracing::{debug, warn};

/// Long-term facts plus short-term dialogue for every user.
pub struct BotMemory {
    store: Arc<dyn FactStore + Send + Sync>,
    short_term: ShortTermBuffer,
    extractor: Box<dyn FactExtractor>,
}

impl BotMemory {
    pub fn new(
        store: Arc<dyn FactStore + Send + Sync>,
        short_term_capacity: usize,
        extractor: Box<dyn FactExtractor>,
    ) -> Self {
        Self {
            store,
            short_term: ShortTermBuffer::new(short_term_capacity),
            extractor,
        }
    }

    /// Persist one fact about a user.
    pub async fn remember_fact(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), MemoryError> {
        self.store.remember_fact(user_id, key, value).await
    }

    /// All stored facts for a user, keyed by fact name.
    pub async fn get_user_facts(&self, user_id: i64) -> Result<FactMap, MemoryError> {
        self.store.user_facts(user_id).await
    }

    /// Run the extractor over an incoming message and persist any hits.
    ///
    /// Never fails: extraction is a side channel of the conversation, so a
    /// storage error is logged and dropped.
    pub async fn extract_facts_from_message(&self, user_id: i64, text: &str) {
        for fact in self.extractor.extract(text) {
            debug!(user_id, key = %fact.key, value = %fact.value, "Extracted fact");
            if let Err(e) = self.store.remember_fact(user_id, &fact.key, &fact.value).await {
                warn!(user_id, key = %fact.key, "Failed to store extracted fact: {e}");
            }
        }
    }

    /// Render the stored facts into a prompt block.
    ///
    /// Known keys get a natural-language line; anything else falls back to
    /// `- key: value`. Empty string when nothing is known.
    pub async fn get_user_context(&self, user_id: i64) -> Result<String, MemoryError> {
        let facts = self.store.user_facts(user_id).await?;
        if facts.is_empty() {
            return Ok(String::new());
        }

        let mut lines = vec!["\n**Что я знаю о пользователе:**".to_string()];
        for (key, fact) in &facts {
            let line = match key.as_str() {
                "name" => format!("- Его/ее зовут {}", fact.value),
                "city" => format!("- Он/она из {}", fact.value),
                "interest" => format!("- Он/она интересуется {}", fact.value),
                other => format!("- {other}: {}", fact.value),
            };
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    /// Record a turn in the short-term dialogue buffer.
    pub async fn add_to_short_term(&self, user_id: i64, role: Role, text: &str) {
        self.short_term.add(user_id, role, text).await;
    }

    /// Rendered recent-dialogue block, excluding the current query.
    pub async fn get_conversation_context(&self, user_id: i64, max_messages: usize) -> String {
        self.short_term
            .conversation_context(user_id, max_messages)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::RussianHeuristics;
    use crate::store::SqliteFactStore;

    async fn test_memory() -> BotMemory {
        let store = SqliteFactStore::new("sqlite::memory:").await.unwrap();
        BotMemory::new(Arc::new(store), 10, Box::new(RussianHeuristics::new()))
    }

    #[tokio::test]
    async fn extraction_persists_facts() {
        let memory = test_memory().await;
        memory
            .extract_facts_from_message(1, "Меня зовут Олег, увлекаюсь рыбалкой")
            .await;

        let facts = memory.get_user_facts(1).await.unwrap();
        assert_eq!(facts["name"].value, "Олег,");
        assert_eq!(facts["interest"].value, "рыбалкой");
    }

    #[tokio::test]
    async fn user_context_renders_known_keys() {
        let memory = test_memory().await;
        memory.remember_fact(1, "name", "Олег").await.unwrap();
        memory.remember_fact(1, "city", "Самары").await.unwrap();
        memory.remember_fact(1, "timezone", "UTC+3").await.unwrap();

        let context = memory.get_user_context(1).await.unwrap();
        assert!(context.starts_with("\n**Что я знаю о пользователе:**"));
        assert!(context.contains("- Его/ее зовут Олег"));
        assert!(context.contains("- Он/она из Самары"));
        assert!(context.contains("- timezone: UTC+3"));
    }

    #[tokio::test]
    async fn user_context_empty_for_stranger() {
        let memory = test_memory().await;
        assert_eq!(memory.get_user_context(42).await.unwrap(), "");
    }

    #[tokio::test]
    async fn short_term_flows_through_facade() {
        let memory = test_memory().await;
        memory.add_to_short_term(1, Role::User, "как дела?").await;
        memory.add_to_short_term(1, Role::Assistant, "отлично").await;
        memory.add_to_short_term(1, Role::User, "расскажи анекдот").await;

        let context = memory.get_conversation_context(1, 5).await;
        assert!(context.contains("Пользователь: как дела?..."));
        assert!(context.contains("Шмель: отлично..."));
        assert!(!context.contains("анекдот"));
    }
}
