//! Tavily web search with a monthly request budget.
//!
//! The free Tavily tier is metered per calendar month, so the client keeps
//! its own counter and refuses to go over. Results are reordered to put
//! Russian-language sources first: the audience reads Russian, and Tavily
//! tends to rank English sources higher regardless of query language.

use bumblebot_core::error::RetrievalError;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

const API_URL: &str = "https://api.tavily.com/search";

/// Snippet body length in formatted output.
const SNIPPET_CHARS: usize = 200;

/// Domains treated as Russian-language regardless of content.
const RUSSIAN_DOMAINS: [&str; 10] = [
    "ria.ru",
    "lenta.ru",
    "tass.ru",
    "rbc.ru",
    "gazeta.ru",
    "kommersant.ru",
    "vedomosti.ru",
    "iz.ru",
    "kp.ru",
    "aif.ru",
];

/// Frequent Russian function words, for scoring transliterated snippets.
const RUSSIAN_WORDS: [&str; 8] = ["в", "и", "на", "не", "что", "это", "как", "для"];

/// One search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

struct UsageWindow {
    month: (i32, u32),
    used: u32,
}

/// Metered Tavily client.
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    monthly_limit: u32,
    usage: Mutex<UsageWindow>,
    api_url: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>, monthly_limit: u32) -> Self {
        let now = Utc::now();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            monthly_limit,
            usage: Mutex::new(UsageWindow {
                month: (now.year(), now.month()),
                used: 0,
            }),
            api_url: API_URL.to_string(),
        }
    }

    /// Point the client at a different host. Used by tests.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Take one unit from the monthly budget, rolling the window over at a
    /// month boundary.
    async fn consume_budget(&self) -> Result<(), RetrievalError> {
        let mut usage = self.usage.lock().await;
        let now = Utc::now();
        let current = (now.year(), now.month());
        if usage.month != current {
            info!(used = usage.used, "Monthly search budget reset");
            usage.month = current;
            usage.used = 0;
        }
        if usage.used >= self.monthly_limit {
            return Err(RetrievalError::LimitExhausted {
                limit: self.monthly_limit,
                window: "month",
            });
        }
        usage.used += 1;
        Ok(())
    }

    /// General web search, Russian sources first.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, RetrievalError> {
        self.request(query, None).await
    }

    /// Recent-news search (last week), Russian sources first.
    pub async fn search_news(&self, query: &str) -> Result<Vec<SearchResult>, RetrievalError> {
        self.request(query, Some(7)).await
    }

    async fn request(
        &self,
        query: &str,
        news_days: Option<u32>,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        self.consume_budget().await?;
        debug!(query, "Tavily search");

        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results: 5,
            topic: if news_days.is_some() { "news" } else { "general" },
            days: news_days,
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Http(format!(
                "Tavily returned {status}"
            )));
        }

        let parsed: TavilyResponse = response.json().await.map_err(|e| {
            RetrievalError::MalformedResponse {
                origin: "tavily".into(),
                reason: e.to_string(),
            }
        })?;

        Ok(prefer_russian(parsed.results))
    }

    /// Budget status line for `/search` without arguments.
    pub async fn limits_status(&self) -> String {
        let usage = self.usage.lock().await;
        format!(
            "Поисковых запросов в этом месяце: {} из {}",
            usage.used, self.monthly_limit
        )
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("api_key", &"[REDACTED]")
            .field("monthly_limit", &self.monthly_limit)
            .finish()
    }
}

/// Stable reorder: Russian-looking results first, original order otherwise.
fn prefer_russian(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let (mut russian, other): (Vec<_>, Vec<_>) =
        results.into_iter().partition(is_russian_result);
    russian.extend(other);
    russian
}

/// Heuristic language check on one result.
fn is_russian_result(result: &SearchResult) -> bool {
    if RUSSIAN_DOMAINS.iter().any(|d| result.url.contains(d)) {
        return true;
    }

    let text = format!("{} {}", result.title, result.content);
    let total = text.chars().filter(|c| c.is_alphabetic()).count();
    if total == 0 {
        return false;
    }
    let cyrillic = text
        .chars()
        .filter(|c| ('\u{0400}'..='\u{04FF}').contains(c))
        .count();
    if cyrillic as f64 / total as f64 > 0.3 {
        return true;
    }

    let lower = text.to_lowercase();
    RUSSIAN_WORDS
        .iter()
        .filter(|w| lower.split_whitespace().any(|token| token == **w))
        .count()
        >= 2
}

/// Render search hits as a Telegram message.
pub fn format_search_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("🔍 По запросу «{query}» ничего не нашлось.");
    }
    let mut out = format!("🔍 Результаты поиска по запросу «{query}»:\n");
    for (i, result) in results.iter().enumerate() {
        let snippet: String = result.content.chars().take(SNIPPET_CHARS).collect();
        out.push_str(&format!(
            "\n{}. **{}**\n{}\n🔗 {}\n",
            i + 1,
            result.title,
            snippet,
            result.url
        ));
    }
    out
}

/// Render news hits as a Telegram message.
pub fn format_news_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("📰 Новостей по запросу «{query}» не нашлось.");
    }
    let mut out = format!("📰 Новости по запросу «{query}»:\n");
    for (i, result) in results.iter().enumerate() {
        let snippet: String = result.content.chars().take(SNIPPET_CHARS).collect();
        out.push_str(&format!(
            "\n{}. **{}**\n{}\n🔗 {}\n",
            i + 1,
            result.title,
            snippet,
            result.url
        ));
    }
    out
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}
