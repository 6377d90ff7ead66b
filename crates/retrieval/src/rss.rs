//! Headlines from Russian RSS feeds.
//!
//! A fixed table of well-known feeds, polled on demand. Feed payloads carry
//! HTML fragments and entity escapes in summaries, so every body goes
//! through tag stripping and entity decoding before it reaches Telegram.
//! Fetches are metered per day to be a polite consumer.

use bumblebot_core::error::RetrievalError;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// (display name, feed URL) for every polled source.
const SOURCES: [(&str, &str); 5] = [
    ("Лента.ру", "https://lenta.ru/rss/news"),
    ("РИА Новости", "https://ria.ru/export/rss2/archive/index.xml"),
    ("ТАСС", "https://tass.ru/rss/v2.xml"),
    ("РБК", "https://rssexport.rbc.ru/rbcnews/news/30/full.rss"),
    ("Газета.Ру", "https://www.gazeta.ru/export/rss/lenta.xml"),
];

/// Entries taken from each source per digest.
const ENTRIES_PER_SOURCE: usize = 3;

/// Entries in the final digest, newest first across all sources.
const DIGEST_LIMIT: usize = 5;

/// Search scans this many of the freshest entries across all sources.
const SEARCH_POOL: usize = 50;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static pattern"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

/// One feed entry, cleaned for display.
#[derive(Debug, Clone)]
pub struct NewsItem {
    pub source: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

struct DailyWindow {
    day: NaiveDate,
    used: u32,
}

/// Metered RSS client over the fixed source table.
pub struct RssNewsClient {
    client: reqwest::Client,
    daily_limit: u32,
    usage: Mutex<DailyWindow>,
}

impl RssNewsClient {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            daily_limit,
            usage: Mutex::new(DailyWindow {
                day: Utc::now().date_naive(),
                used: 0,
            }),
        }
    }

    async fn consume_budget(&self) -> Result<(), RetrievalError> {
        let mut usage = self.usage.lock().await;
        let today = Utc::now().date_naive();
        if usage.day != today {
            usage.day = today;
            usage.used = 0;
        }
        if usage.used >= self.daily_limit {
            return Err(RetrievalError::LimitExhausted {
                limit: self.daily_limit,
                window: "day",
            });
        }
        usage.used += 1;
        Ok(())
    }

    /// A digest of the freshest entries across every source, newest first.
    ///
    /// A source that fails to fetch or parse is logged and skipped; the
    /// digest fails only when nothing could be fetched at all.
    pub async fn latest_news(&self) -> Result<Vec<NewsItem>, RetrievalError> {
        self.consume_budget().await?;

        let mut items = Vec::new();
        for (name, url) in SOURCES {
            match self.fetch_source(name, url).await {
                Ok(entries) => items.extend(entries.into_iter().take(ENTRIES_PER_SOURCE)),
                Err(e) => warn!(source = name, "Feed fetch failed: {e}"),
            }
        }

        if items.is_empty() {
            return Err(RetrievalError::Http("All feeds unavailable".into()));
        }
        Ok(newest_first(items, DIGEST_LIMIT))
    }

    /// Case-insensitive substring search over the freshest entries.
    pub async fn search_news(&self, query: &str) -> Result<Vec<NewsItem>, RetrievalError> {
        self.consume_budget().await?;

        let mut pool = Vec::new();
        for (name, url) in SOURCES {
            match self.fetch_source(name, url).await {
                Ok(entries) => pool.extend(entries),
                Err(e) => warn!(source = name, "Feed fetch failed: {e}"),
            }
        }
        let pool = newest_first(pool, SEARCH_POOL);

        let needle = query.to_lowercase();
        Ok(pool
            .into_iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&needle)
                    || item.summary.to_lowercase().contains(&needle)
            })
            .collect())
    }

    async fn fetch_source(&self, name: &str, url: &str) -> Result<Vec<NewsItem>, RetrievalError> {
        debug!(source = name, "Fetching feed");
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?;

        let feed = feed_rs::parser::parse(&bytes[..]).map_err(|e| {
            RetrievalError::MalformedResponse {
                origin: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(feed
            .entries
            .into_iter()
            .map(|entry| NewsItem {
                source: name.to_string(),
                title: clean_html(entry.title.map(|t| t.content).unwrap_or_default().as_str()),
                summary: clean_html(
                    entry.summary.map(|t| t.content).unwrap_or_default().as_str(),
                ),
                link: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
                published: entry.published,
            })
            .collect())
    }

    /// The source table, rendered for `/sources`.
    pub fn sources_list(&self) -> String {
        let mut out = String::from("📚 Источники новостей:\n");
        for (name, url) in SOURCES {
            out.push_str(&format!("• {name} — {url}\n"));
        }
        out
    }
}

/// Sort by publication date descending (undated entries last) and cap.
fn newest_first(mut items: Vec<NewsItem>, limit: usize) -> Vec<NewsItem> {
    items.sort_by(|a, b| b.published.cmp(&a.published));
    items.truncate(limit);
    items
}

/// Strip tags, decode entities, collapse whitespace.
fn clean_html(raw: &str) -> String {
    let no_tags = TAG_RE.replace_all(raw, " ");
    let decoded = html_escape::decode_html_entities(&no_tags);
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Render a digest or search hits as a Telegram message.
pub fn format_news_results(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return "📰 Свежих новостей не нашлось.".to_string();
    }

    let mut out = String::from("📰 **Свежие новости:**\n");
    let mut current_source = "";
    for item in items {
        if item.source != current_source {
            out.push_str(&format!("\n**{}:**\n", item.source));
            current_source = &item.source;
        }
        let when = item
            .published
            .map(|d| format!(" ({})", d.format("%d.%m.%Y %H:%M")))
            .unwrap_or_default();
        out.push_str(&format!("• {}{when}\n  {}\n", item.title, item.link));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, title: &str, summary: &str) -> NewsItem {
        NewsItem {
            source: source.into(),
            title: title.into(),
            summary: summary.into(),
            link: "https://example.ru/1".into(),
            published: Some(
                "2026-08-20T10:30:00Z".parse().unwrap(),
            ),
        }
    }

    #[test]
    fn html_is_stripped_and_decoded() {
        assert_eq!(
            clean_html("<p>Цены &laquo;выросли&raquo; на   5%</p>"),
            "Цены «выросли» на 5%"
        );
        assert_eq!(clean_html("<img src=\"x.jpg\"/>Заголовок"), "Заголовок");
        assert_eq!(clean_html(""), "");
    }

    #[test]
    fn digest_groups_by_source_with_dates() {
        let items = vec![
            item("Лента.ру", "Первая", ""),
            item("Лента.ру", "Вторая", ""),
            item("ТАСС", "Третья", ""),
        ];
        let rendered = format_news_results(&items);
        assert!(rendered.contains("**Лента.ру:**"));
        assert!(rendered.contains("**ТАСС:**"));
        assert!(rendered.contains("• Первая (20.08.2026 10:30)"));
        // One source header per block, not per item
        assert_eq!(rendered.matches("**Лента.ру:**").count(), 1);
    }

    #[test]
    fn digest_is_newest_first_and_capped() {
        let dated = |source: &str, title: &str, when: &str| NewsItem {
            published: Some(when.parse().unwrap()),
            ..item(source, title, "")
        };
        let items = vec![
            dated("Лента.ру", "вчерашняя", "2026-08-19T09:00:00Z"),
            dated("Лента.ру", "утренняя", "2026-08-20T08:00:00Z"),
            dated("ТАСС", "свежая", "2026-08-20T12:00:00Z"),
            NewsItem {
                published: None,
                ..item("РБК", "без даты", "")
            },
        ];

        let ordered = newest_first(items, 3);
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[0].title, "свежая");
        assert_eq!(ordered[1].title, "утренняя");
        assert_eq!(ordered[2].title, "вчерашняя");
    }

    #[test]
    fn empty_digest_renders_a_notice() {
        assert!(format_news_results(&[]).contains("не нашлось"));
    }

    #[test]
    fn sources_list_names_every_feed() {
        let rendered = RssNewsClient::new(100).sources_list();
        for (name, _) in SOURCES {
            assert!(rendered.contains(name));
        }
    }

    #[tokio::test]
    async fn daily_budget_is_enforced() {
        let client = RssNewsClient::new(1);
        client.consume_budget().await.unwrap();
        let err = client.consume_budget().await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::LimitExhausted { limit: 1, window: "day" }
        ));
    }
}
