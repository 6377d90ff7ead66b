//! Short-term dialogue buffer.
//!
//! A bounded per-user window of the most recent (role, text) turns, used to
//! give the model recent conversational context. Strict FIFO: at capacity the
//! oldest turn is evicted before the new one is appended. Process-lifetime
//! only — nothing here is persisted.

use bumblebot_core::message::{truncate_body, DialogueTurn, Role};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

/// Default number of turns rendered into the context block.
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

/// Rendered message bodies are cut at this many characters.
const BODY_CHARS: usize = 100;

/// Per-user bounded dialogue history.
pub struct ShortTermBuffer {
    capacity: usize,
    turns: RwLock<HashMap<i64, VecDeque<DialogueTurn>>>,
}

impl ShortTermBuffer {
    /// Create a buffer holding at most `capacity` turns per user.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: RwLock::new(HashMap::new()),
        }
    }

    /// Append a turn, evicting the oldest one at capacity.
    pub async fn add(&self, user_id: i64, role: Role, text: &str) {
        let mut turns = self.turns.write().await;
        let buffer = turns.entry(user_id).or_default();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(DialogueTurn {
            role,
            text: text.to_string(),
            timestamp: chrono::Utc::now(),
        });
        debug!(user_id, ?role, "Turn added to short-term memory");
    }

    /// The most recent `limit` turns, oldest first.
    pub async fn recent(&self, user_id: i64, limit: usize) -> Vec<DialogueTurn> {
        let turns = self.turns.read().await;
        match turns.get(&user_id) {
            Some(buffer) => {
                let skip = buffer.len().saturating_sub(limit);
                buffer.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Render a labeled transcript of the recent dialogue.
    ///
    /// The very last turn is excluded — it is assumed to be the query
    /// currently being answered. Returns an empty string with no history.
    pub async fn conversation_context(&self, user_id: i64, max_messages: usize) -> String {
        let recent = self.recent(user_id, max_messages).await;
        if recent.is_empty() {
            return String::new();
        }

        let mut lines = vec!["\n**Последние сообщения в диалоге:**".to_string()];
        for turn in &recent[..recent.len() - 1] {
            let prefix = match turn.role {
                Role::User => "Пользователь",
                Role::Assistant => "Шмель",
            };
            lines.push(format!("{prefix}: {}", truncate_body(&turn.text, BODY_CHARS)));
        }
        lines.join("\n")
    }
}
