//! Telegram Bot API channel over long polling.
//!
//! One background task polls `getUpdates` with a 30s hold and forwards every
//! text message into the mpsc pipe. Outbound traffic (`sendMessage`,
//! `sendChatAction`) goes straight through the shared HTTP client. The
//! allowlist is enforced by the caller via [`Channel::is_allowed`]; the
//! channel itself delivers everything it sees.

use async_trait::async_trait;
use bumblebot_core::channel::{Channel, ChannelMessage, ReplyContext};
use bumblebot_core::error::ChannelError;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const POLL_TIMEOUT_SECS: u32 = 30;

/// Long-polling Telegram channel.
pub struct TelegramChannel {
    client: reqwest::Client,
    token: String,
    allowed_chats: Vec<i64>,
    running: Arc<AtomicBool>,
}

impl TelegramChannel {
    /// `allowed_chats` empty means every chat is allowed.
    pub fn new(token: impl Into<String>, allowed_chats: Vec<i64>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            allowed_chats,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    async fn poll_loop(
        client: reqwest::Client,
        base_url: String,
        tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
        running: Arc<AtomicBool>,
    ) {
        let mut offset: i64 = 0;
        while running.load(Ordering::Relaxed) {
            let response = client
                .get(format!("{base_url}/getUpdates"))
                .query(&[
                    ("offset", offset.to_string()),
                    ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ])
                .send()
                .await;

            let updates: UpdatesResponse = match response {
                Ok(r) => match r.json().await {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!("getUpdates decode failed: {e}");
                        continue;
                    }
                },
                Err(e) => {
                    warn!("getUpdates failed: {e}");
                    let report = tx
                        .send(Err(ChannelError::ConnectionLost(e.to_string())))
                        .await;
                    if report.is_err() {
                        break;
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates.result {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message.and_then(convert_message) else {
                    continue;
                };
                debug!(
                    chat_id = message.chat_id,
                    sender_id = message.sender_id,
                    "Update received"
                );
                if tx.send(Ok(message)).await.is_err() {
                    info!("Receiver dropped, stopping poll loop");
                    return;
                }
            }
        }
        info!("Telegram poll loop stopped");
    }
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("token", &"[REDACTED]")
            .field("allowed_chats", &self.allowed_chats)
            .finish()
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        if self.token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "Telegram bot token is empty".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(100);
        self.running.store(true, Ordering::Relaxed);
        info!("Telegram channel starting (long polling)");

        let client = self.client.clone();
        let base_url = format!("https://api.telegram.org/bot{}", self.token);
        let running = Arc::clone(&self.running);
        tokio::spawn(Self::poll_loop(client, base_url, tx, running));

        Ok(rx)
    }

    async fn send(&self, chat_id: i64, content: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": content,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                chat_id,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let reason = format!("sendMessage returned {}", response.status());
            error!(chat_id, "{reason}");
            return Err(ChannelError::DeliveryFailed { chat_id, reason });
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), ChannelError> {
        // Best effort, a failed indicator never blocks the reply
        let result = self
            .client
            .post(self.api_url("sendChatAction"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "action": "typing",
            }))
            .send()
            .await;
        if let Err(e) = result {
            debug!(chat_id, "sendChatAction failed: {e}");
        }
        Ok(())
    }

    fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        self.running.store(false, Ordering::Relaxed);
        info!("Telegram channel stop requested");
        Ok(())
    }
}

fn convert_message(message: TgMessage) -> Option<ChannelMessage> {
    let text = message.text?;
    let from = message.from?;
    Some(ChannelMessage {
        chat_id: message.chat.id,
        sender_id: from.id,
        sender_name: from.first_name,
        text,
        is_group: matches!(message.chat.kind.as_str(), "group" | "supergroup"),
        reply_to: message.reply_to_message.and_then(|replied| {
            Some(ReplyContext {
                from_bot: replied.from.as_ref().map(|u| u.is_bot).unwrap_or(false),
                text: replied.text.clone()?,
            })
        }),
    })
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    from: Option<TgUser>,
    chat: TgChat,
    text: Option<String>,
    reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    is_bot: bool,
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}
