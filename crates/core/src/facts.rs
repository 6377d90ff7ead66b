//! Fact storage and extraction traits.
//!
//! A *fact* is a single key/value datum inferred about a user from their own
//! messages (name, city, interest). Facts are upserted with last-write-wins
//! per key and never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::MemoryError;

/// A single stored fact about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFact {
    /// The fact value (e.g. "Александр", "Париж")
    pub value: String,

    /// When this fact was last written
    pub updated_at: DateTime<Utc>,
}

impl UserFact {
    pub fn now(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            updated_at: Utc::now(),
        }
    }
}

/// All known facts for one user, keyed by fact key.
///
/// `BTreeMap` keeps the serialized JSON deterministic.
pub type FactMap = BTreeMap<String, UserFact>;

/// Durable per-user fact storage.
///
/// Implementations: SQLite (production), in-memory (tests).
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Upsert `{value, updated_at=now}` under `key` for `user_id`.
    /// Idempotent under repeated identical input.
    async fn remember_fact(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), MemoryError>;

    /// Full fact mapping for a user; empty when none exist.
    async fn user_facts(&self, user_id: i64) -> std::result::Result<FactMap, MemoryError>;
}

/// A fact detected in a message, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub key: String,
    pub value: String,
}

impl ExtractedFact {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Rule-based fact detection over free text.
///
/// Purely lexical and best-effort: non-matching text yields an empty list,
/// never an error. Implementations are locale-specific; the pipeline only
/// sees this trait, so alternate languages or a model-based extractor can be
/// swapped in without touching storage or buffer code.
pub trait FactExtractor: Send + Sync {
    /// Scan `text` and return every fact it discloses.
    fn extract(&self, text: &str) -> Vec<ExtractedFact>;
}
