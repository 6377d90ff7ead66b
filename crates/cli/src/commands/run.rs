//! `bumblebot run` — Connect to Telegram and serve chats.
//!
//! Wires every service from config, starts the long-polling channel, and
//! routes each incoming message: slash commands are answered directly from
//! the retrieval adapters, everything else goes through the trigger check
//! and the model pipeline.

use bumblebot_agent::MessageHandler;
use bumblebot_channels::{extract_trigger, TelegramChannel};
use bumblebot_config::AppConfig;
use bumblebot_context::{ChatStatsStore, GroupContextTracker};
use bumblebot_core::channel::{Channel, ChannelMessage};
use bumblebot_memory::{BotMemory, RussianHeuristics, SqliteFactStore};
use bumblebot_providers::GeminiProvider;
use bumblebot_retrieval::{rss, tavily, RssNewsClient, TavilyClient, WeatherClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Feed fetches allowed per day.
const RSS_DAILY_LIMIT: u32 = 100;

const GREETING: &str = "Привет! Я Шмель 🐝\n\
    Пиши мне в личку или упоминай в группе — отвечу.\n\n\
    Команды:\n\
    /weather <город> — погода\n\
    /search <запрос> — поиск в интернете\n\
    /news [запрос] — свежие новости\n\
    /sources — источники новостей\n\
    /stats — ваша статистика в чате";

struct Services {
    channel: TelegramChannel,
    handler: MessageHandler,
    weather: WeatherClient,
    search: Option<TavilyClient>,
    news: RssNewsClient,
    stats: Arc<ChatStatsStore>,
    bot_username: String,
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let token = config
        .telegram
        .bot_token
        .clone()
        .ok_or("No Telegram bot token — set TELEGRAM_BOT_TOKEN")?;
    let api_key = config
        .llm
        .api_key
        .clone()
        .ok_or("No LLM API key — set GEMINI_API_KEY")?;

    let store = SqliteFactStore::new(&config.memory.db_path).await?;
    let memory = Arc::new(BotMemory::new(
        Arc::new(store),
        config.memory.short_term_capacity,
        Box::new(RussianHeuristics::new()),
    ));
    let tracker = Arc::new(GroupContextTracker::new(
        config.context.chat_history,
        config.context.user_history,
        config.context.max_chats,
    ));
    let stats = Arc::new(ChatStatsStore::new(&config.context.stats_db_path).await?);
    let provider = Arc::new(GeminiProvider::new(
        api_key,
        config.llm.model.clone(),
        config.llm.temperature,
    ));

    let services = Services {
        channel: TelegramChannel::new(token, config.telegram.allowed_chats.clone()),
        handler: MessageHandler::new(
            memory,
            tracker,
            Some(Arc::clone(&stats)),
            provider,
            config.llm.persona.clone(),
            "Шмель",
        ),
        weather: WeatherClient::new(),
        search: config
            .search
            .api_key
            .clone()
            .map(|key| TavilyClient::new(key, config.search.monthly_limit)),
        news: RssNewsClient::new(RSS_DAILY_LIMIT),
        stats,
        bot_username: config.telegram.bot_username.clone(),
    };

    info!(model = %config.llm.model, "Bumblebot starting");
    let mut rx = services.channel.start().await?;

    while let Some(incoming) = rx.recv().await {
        let message = match incoming {
            Ok(message) => message,
            Err(e) => {
                warn!("Channel error: {e}");
                continue;
            }
        };

        if !services.channel.is_allowed(message.chat_id) {
            warn!(chat_id = message.chat_id, "Message from disallowed chat dropped");
            continue;
        }

        let reply = dispatch(&services, &message).await;
        if let Some(reply) = reply {
            if let Err(e) = services.channel.send(message.chat_id, &reply).await {
                warn!(chat_id = message.chat_id, "Send failed: {e}");
            }
        }
    }

    services.channel.stop().await?;
    Ok(())
}

async fn dispatch(services: &Services, message: &ChannelMessage) -> Option<String> {
    if let Some((command, args)) = parse_command(&message.text, &services.bot_username) {
        return Some(handle_command(services, message, command, args).await);
    }

    let query = extract_trigger(message, &services.bot_username)?;
    if query.is_empty() {
        return None;
    }

    let _ = services.channel.send_typing(message.chat_id).await;
    Some(services.handler.handle(message, &query).await)
}

async fn handle_command(
    services: &Services,
    message: &ChannelMessage,
    command: &str,
    args: &str,
) -> String {
    match command {
        "/start" => GREETING.to_string(),

        "/weather" => {
            if args.is_empty() {
                return "Укажите город: /weather Москва".to_string();
            }
            match services.weather.current(args).await {
                Ok(report) => report.format(),
                Err(e) => {
                    warn!("Weather lookup failed: {e}");
                    format!("Не удалось узнать погоду для «{args}» 😔")
                }
            }
        }

        "/search" => {
            let Some(client) = &services.search else {
                return "Поиск не настроен: нет ключа Tavily.".to_string();
            };
            if args.is_empty() {
                return client.limits_status().await;
            }
            match client.search(args).await {
                Ok(results) => tavily::format_search_results(args, &results),
                Err(e) => {
                    warn!("Search failed: {e}");
                    format!("Поиск не удался: {e}")
                }
            }
        }

        "/news" => {
            let result = if args.is_empty() {
                services.news.latest_news().await
            } else {
                services.news.search_news(args).await
            };
            match result {
                Ok(items) => rss::format_news_results(&items),
                Err(e) => {
                    warn!("News fetch failed: {e}");
                    "Не удалось получить новости, попробуйте позже.".to_string()
                }
            }
        }

        "/sources" => services.news.sources_list(),

        "/stats" => match services
            .stats
            .get_user_stats(message.chat_id, message.sender_id)
            .await
        {
            Ok(stats) => {
                let mut out = format!(
                    "📊 Ваша статистика в этом чате:\nСообщений: {}",
                    stats.message_count
                );
                for (key, value) in &stats.facts {
                    out.push_str(&format!("\n{key}: {value}"));
                }
                out
            }
            Err(e) => {
                warn!("Stats lookup failed: {e}");
                "Статистика временно недоступна.".to_string()
            }
        },

        _ => format!("Не знаю команду {command}. Попробуйте /start"),
    }
}

/// Split `/cmd[@bot] args` into the command and its argument string.
///
/// Telegram appends `@bot_username` to commands in groups; a command
/// addressed to a different bot is not ours and yields `None`.
fn parse_command<'a>(text: &'a str, bot_username: &str) -> Option<(&'a str, &'a str)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (head, args) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    let command = match head.split_once('@') {
        Some((command, addressee)) => {
            if !addressee.eq_ignore_ascii_case(bot_username) {
                return None;
            }
            command
        }
        None => head,
    };

    Some((command, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_command() {
        assert_eq!(parse_command("/start", "shmel_bot"), Some(("/start", "")));
    }

    #[test]
    fn command_with_args() {
        assert_eq!(
            parse_command("/weather Санкт-Петербург", "shmel_bot"),
            Some(("/weather", "Санкт-Петербург"))
        );
    }

    #[test]
    fn addressed_command_is_ours() {
        assert_eq!(
            parse_command("/news@shmel_bot спорт", "shmel_bot"),
            Some(("/news", "спорт"))
        );
    }

    #[test]
    fn command_for_another_bot_is_ignored() {
        assert_eq!(parse_command("/news@other_bot", "shmel_bot"), None);
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("привет /start", "shmel_bot"), None);
        assert_eq!(parse_command("просто текст", "shmel_bot"), None);
    }
}
