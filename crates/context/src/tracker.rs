//! In-memory group chat history.
//!
//! Two bounded windows per chat: the chat-wide stream of everything said,
//! and a per-user thread holding that user's exchange with the bot. Both are
//! strict FIFO. The tracker caps the number of chats it holds; when a new
//! chat would exceed the cap, the least recently active chat is dropped
//! wholesale.

use bumblebot_core::message::{truncate_body, GroupMessage};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Rendered message bodies are cut at this many characters.
const BODY_CHARS: usize = 100;

/// Default window of chat-wide messages rendered into context.
const DEFAULT_CHAT_WINDOW: usize = 10;

/// Default window of user-thread messages rendered into context.
const DEFAULT_USER_WINDOW: usize = 5;

/// The rendered context blocks for one incoming group message.
#[derive(Debug, Clone)]
pub struct CombinedContext {
    /// The user's own thread with the bot
    pub user_context: String,

    /// What everyone else said recently
    pub chat_context: String,

    /// Both blocks joined, ready for prompt assembly
    pub full_context: String,
}

struct ChatState {
    messages: VecDeque<GroupMessage>,
    per_user: HashMap<i64, VecDeque<GroupMessage>>,
    last_active: DateTime<Utc>,
}

impl ChatState {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            per_user: HashMap::new(),
            last_active: Utc::now(),
        }
    }
}

/// Bounded history of who said what in each group chat.
pub struct GroupContextTracker {
    chat_capacity: usize,
    user_capacity: usize,
    max_chats: usize,
    chats: RwLock<HashMap<i64, ChatState>>,
}

impl GroupContextTracker {
    pub fn new(chat_capacity: usize, user_capacity: usize, max_chats: usize) -> Self {
        Self {
            chat_capacity,
            user_capacity,
            max_chats,
            chats: RwLock::new(HashMap::new()),
        }
    }

    /// Record a message in the chat-wide window and the author's thread.
    ///
    /// Bot replies are recorded under the user they answer, so `user_id` is
    /// the thread owner rather than the author when `is_bot` is set.
    pub async fn add_message(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        text: &str,
        is_bot: bool,
    ) {
        let mut chats = self.chats.write().await;

        if !chats.contains_key(&chat_id) && chats.len() >= self.max_chats {
            Self::evict_least_recently_active(&mut chats);
        }

        let chat = chats.entry(chat_id).or_insert_with(ChatState::new);
        chat.last_active = Utc::now();

        let message = GroupMessage {
            user_id,
            user_name: user_name.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            is_bot,
        };

        if chat.messages.len() >= self.chat_capacity {
            chat.messages.pop_front();
        }
        chat.messages.push_back(message.clone());

        let thread = chat.per_user.entry(user_id).or_default();
        if thread.len() >= self.user_capacity {
            thread.pop_front();
        }
        thread.push_back(message);

        debug!(chat_id, user_id, is_bot, "Group message recorded");
    }

    fn evict_least_recently_active(chats: &mut HashMap<i64, ChatState>) {
        let stalest = chats
            .iter()
            .min_by_key(|(_, state)| state.last_active)
            .map(|(id, _)| *id);
        if let Some(chat_id) = stalest {
            chats.remove(&chat_id);
            info!(chat_id, "Evicted least recently active chat");
        }
    }

    /// Render the most recent `max_messages` of the user's own thread with
    /// the bot, oldest first.
    ///
    /// Empty string when the user has no history in this chat.
    pub async fn user_context(&self, chat_id: i64, user_id: i64, max_messages: usize) -> String {
        let chats = self.chats.read().await;
        let Some(thread) = chats.get(&chat_id).and_then(|c| c.per_user.get(&user_id)) else {
            return String::new();
        };
        if thread.is_empty() {
            return String::new();
        }

        let skip = thread.len().saturating_sub(max_messages);
        let mut lines = vec!["📝 **История вашего общения со мной:**".to_string()];
        for message in thread.iter().skip(skip) {
            let prefix = if message.is_bot { "Я" } else { "Вы" };
            lines.push(format!(
                "{prefix}: {}",
                truncate_body(&message.text, BODY_CHARS)
            ));
        }
        lines.join("\n")
    }

    /// Render what everyone else said recently, oldest first.
    ///
    /// The window is the last `max_messages` chat-wide entries; rows
    /// belonging to `exclude_user_id` are then dropped from that window so
    /// the asker's own words do not appear twice in the prompt. The window
    /// never reaches further back to compensate for excluded rows.
    pub async fn chat_context(
        &self,
        chat_id: i64,
        max_messages: usize,
        exclude_user_id: Option<i64>,
    ) -> String {
        let chats = self.chats.read().await;
        let Some(chat) = chats.get(&chat_id) else {
            return String::new();
        };

        let skip = chat.messages.len().saturating_sub(max_messages);
        let selected: Vec<&GroupMessage> = chat
            .messages
            .iter()
            .skip(skip)
            .filter(|m| Some(m.user_id) != exclude_user_id)
            .collect();
        if selected.is_empty() {
            return String::new();
        }

        let mut lines = vec!["👥 **Недавние сообщения в чате:**".to_string()];
        for message in &selected {
            let marker = if message.is_bot { "🤖 " } else { "" };
            lines.push(format!(
                "{marker}{}: {}",
                message.user_name,
                truncate_body(&message.text, BODY_CHARS)
            ));
        }
        lines.join("\n")
    }

    /// Return the context blocks for an incoming message, then record it.
    ///
    /// Reads happen first so the asker's just-submitted message never shows
    /// up in its own context; with no prior history every block is empty.
    pub async fn combined_context(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        text: &str,
    ) -> CombinedContext {
        let user_context = self
            .user_context(chat_id, user_id, DEFAULT_USER_WINDOW)
            .await;
        let chat_context = self
            .chat_context(chat_id, DEFAULT_CHAT_WINDOW, Some(user_id))
            .await;

        self.add_message(chat_id, user_id, user_name, text, false)
            .await;

        let full_context = match (user_context.is_empty(), chat_context.is_empty()) {
            (false, false) => format!("{user_context}\n\n{chat_context}"),
            (false, true) => user_context.clone(),
            (true, false) => chat_context.clone(),
            (true, true) => String::new(),
        };

        CombinedContext {
            user_context,
            chat_context,
            full_context,
        }
    }

    /// Number of chats currently tracked.
    pub async fn tracked_chats(&self) -> usize {
        self.chats.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> GroupContextTracker {
        GroupContextTracker::new(30, 10, 1000)
    }

    #[tokio::test]
    async fn chat_window_is_bounded() {
        let t = GroupContextTracker::new(3, 10, 1000);
        for i in 0..5 {
            t.add_message(-1, 1, "Аня", &format!("msg {i}"), false).await;
        }

        let context = t.chat_context(-1, 10, None).await;
        assert!(!context.contains("msg 0"));
        assert!(!context.contains("msg 1"));
        assert!(context.contains("msg 2"));
        assert!(context.contains("msg 4"));
    }

    #[tokio::test]
    async fn user_thread_is_bounded_independently() {
        let t = GroupContextTracker::new(30, 2, 1000);
        for i in 0..4 {
            t.add_message(-1, 1, "Аня", &format!("msg {i}"), false).await;
        }

        let context = t.user_context(-1, 1, 10).await;
        assert!(!context.contains("msg 1"));
        assert!(context.contains("msg 2"));
        assert!(context.contains("msg 3"));
    }

    #[tokio::test]
    async fn user_context_respects_window() {
        let t = tracker();
        for i in 0..8 {
            t.add_message(-1, 1, "Аня", &format!("msg {i}"), false).await;
        }

        let context = t.user_context(-1, 1, 3).await;
        assert!(!context.contains("msg 4"));
        assert!(context.contains("msg 5"));
        assert!(context.contains("msg 7"));
    }

    #[tokio::test]
    async fn user_context_labels_speakers() {
        let t = tracker();
        t.add_message(-1, 1, "Аня", "привет, бот", false).await;
        t.add_message(-1, 1, "Шмель", "привет, Аня", true).await;

        let context = t.user_context(-1, 1, 5).await;
        assert!(context.starts_with("📝 **История вашего общения со мной:**"));
        assert!(context.contains("Вы: привет, бот..."));
        assert!(context.contains("Я: привет, Аня..."));
    }

    #[tokio::test]
    async fn chat_context_excludes_every_row_of_the_asker() {
        let t = tracker();
        t.add_message(-1, 1, "Аня", "моё сообщение", false).await;
        t.add_message(-1, 2, "Боря", "чужое сообщение", false).await;
        // Bot reply threaded under Аня's id goes with her rows
        t.add_message(-1, 1, "Шмель", "ответ бота", true).await;
        t.add_message(-1, 2, "Шмель", "ответ Боре", true).await;

        let context = t.chat_context(-1, 10, Some(1)).await;
        assert!(!context.contains("моё сообщение"));
        assert!(!context.contains("ответ бота"));
        assert!(context.contains("Боря: чужое сообщение..."));
        assert!(context.contains("🤖 Шмель: ответ Боре..."));
    }

    #[tokio::test]
    async fn chat_context_windows_before_excluding() {
        let t = tracker();
        t.add_message(-1, 2, "Боря", "старое сообщение", false).await;
        for i in 0..3 {
            t.add_message(-1, 1, "Аня", &format!("свежее {i}"), false).await;
        }

        // The last 2 slots are all Аня's; excluding her must not pull
        // Боря's older message back into the window
        assert_eq!(t.chat_context(-1, 2, Some(1)).await, "");
        assert!(t
            .chat_context(-1, 4, Some(1))
            .await
            .contains("Боря: старое сообщение..."));
    }

    #[tokio::test]
    async fn empty_chat_renders_nothing() {
        let t = tracker();
        assert_eq!(t.chat_context(-99, 10, None).await, "");
        assert_eq!(t.user_context(-99, 1, 5).await, "");
    }

    #[tokio::test]
    async fn combined_context_is_empty_without_prior_history() {
        let t = tracker();
        let first = t.combined_context(-1, 1, "Аня", "первое сообщение").await;
        assert_eq!(first.user_context, "");
        assert_eq!(first.chat_context, "");
        assert_eq!(first.full_context, "");
    }

    #[tokio::test]
    async fn combined_context_reads_before_recording() {
        let t = tracker();
        t.combined_context(-1, 1, "Аня", "первое сообщение").await;

        // Аня's message was recorded and is now visible to Боря
        let second = t.combined_context(-1, 2, "Боря", "а я тут").await;
        assert!(second.chat_context.contains("Аня: первое сообщение..."));
        assert_eq!(second.user_context, "");

        // Аня's own next call sees her thread but never her current message
        let third = t.combined_context(-1, 1, "Аня", "второе сообщение").await;
        assert!(third.user_context.contains("Вы: первое сообщение..."));
        assert!(!third.user_context.contains("второе"));
        assert!(third.full_context.contains("📝"));
        assert!(third.full_context.contains("👥"));
    }

    #[tokio::test]
    async fn stale_chats_are_evicted_at_cap() {
        let t = GroupContextTracker::new(30, 10, 2);
        t.add_message(-1, 1, "Аня", "чат один", false).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        t.add_message(-2, 1, "Аня", "чат два", false).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        t.add_message(-3, 1, "Аня", "чат три", false).await;

        assert_eq!(t.tracked_chats().await, 2);
        assert_eq!(t.chat_context(-1, 10, None).await, "");
        assert!(t.chat_context(-3, 10, None).await.contains("чат три"));
    }
}
