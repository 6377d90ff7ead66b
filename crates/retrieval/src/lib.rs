//! Retrieval adapters: external data the bot can fold into a reply.
//!
//! Three clients, each independent and optional at runtime:
//! - [`weather::WeatherClient`] — Open-Meteo geocoding + current conditions
//! - [`tavily::TavilyClient`] — web search with a monthly request budget
//! - [`rss::RssNewsClient`] — headlines from a fixed set of Russian feeds

pub mod rss;
pub mod tavily;
pub mod weather;

pub use rss::RssNewsClient;
pub use tavily::TavilyClient;
pub use weather::{WeatherClient, WeatherReport};
