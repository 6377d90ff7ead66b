//! Fact memory for Bumblebot.
//!
//! Three pieces, combined by the [`BotMemory`] facade:
//! - [`store::SqliteFactStore`] — durable per-user key/value facts
//! - [`short_term::ShortTermBuffer`] — bounded per-user dialogue history
//! - [`extractor::RussianHeuristics`] — rule-based fact detection

pub mod extractor;
pub mod service;
pub mod short_term;
pub mod store;

pub use extractor::RussianHeuristics;
pub use service::BotMemory;
pub use short_term::ShortTermBuffer;
pub use store::SqliteFactStore;
