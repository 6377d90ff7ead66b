//! Group chat awareness for Bumblebot.
//!
//! [`GroupContextTracker`] keeps bounded in-memory history per chat and per
//! (chat, user) so group replies can reference what was just said.
//! [`ChatStatsStore`] persists lightweight per-user activity counters.

pub mod stats;
pub mod tracker;

pub use stats::{ChatStatsStore, UserStats};
pub use tracker::{CombinedContext, GroupContextTracker};
