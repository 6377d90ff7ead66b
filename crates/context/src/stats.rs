//! Per-chat user activity persisted in SQLite.
//!
//! One row per (chat, user) in `chat_user_memory`. Unlike the in-memory
//! tracker this survives restarts, so `/stats` can answer even for chats
//! the process has never seen. Writes happen off the reply path.

use bumblebot_core::error::MemoryError;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

/// What the stats table knows about one user in one chat.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    /// Messages seen from this user in this chat
    pub message_count: i64,

    /// Chat-scoped facts, keyed by fact name
    pub facts: BTreeMap<String, String>,
}

/// SQLite-backed per-chat user stats.
pub struct ChatStatsStore {
    pool: SqlitePool,
}

impl ChatStatsStore {
    /// Open (and migrate) the stats database at `path`.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Chat stats store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_user_memory (
                chat_id       INTEGER NOT NULL,
                user_id       INTEGER NOT NULL,
                user_info     TEXT NOT NULL DEFAULT '',
                facts         TEXT NOT NULL DEFAULT '{}',
                last_seen     TEXT NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (chat_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("chat_user_memory table: {e}")))?;

        debug!("Chat stats migrations complete");
        Ok(())
    }

    /// Count one message from a user, refreshing their display name.
    pub async fn record_message(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
    ) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO chat_user_memory (chat_id, user_id, user_info, last_seen, message_count)
            VALUES (?1, ?2, ?3, ?4, 1)
            ON CONFLICT(chat_id, user_id) DO UPDATE SET
                user_info = excluded.user_info,
                last_seen = excluded.last_seen,
                message_count = chat_user_memory.message_count + 1
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(user_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("stats upsert: {e}")))?;
        Ok(())
    }

    /// Attach a chat-scoped fact to a user, creating the row if needed.
    pub async fn set_fact(
        &self,
        chat_id: i64,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), MemoryError> {
        let mut facts = self.get_user_stats(chat_id, user_id).await?.facts;
        facts.insert(key.to_string(), value.to_string());
        let facts_json = serde_json::to_string(&facts)
            .map_err(|e| MemoryError::Storage(format!("facts serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO chat_user_memory (chat_id, user_id, facts, last_seen, message_count)
            VALUES (?1, ?2, ?3, ?4, 0)
            ON CONFLICT(chat_id, user_id) DO UPDATE SET
                facts = excluded.facts,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(&facts_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("fact upsert: {e}")))?;
        Ok(())
    }

    /// Stats for a user in a chat. Defaults for unknown pairs.
    pub async fn get_user_stats(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<UserStats, MemoryError> {
        let row = sqlx::query(
            "SELECT message_count, facts FROM chat_user_memory WHERE chat_id = ?1 AND user_id = ?2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("stats lookup: {e}")))?;

        match row {
            Some(row) => {
                let message_count: i64 = row
                    .try_get("message_count")
                    .map_err(|e| MemoryError::QueryFailed(format!("message_count column: {e}")))?;
                let raw: String = row
                    .try_get("facts")
                    .map_err(|e| MemoryError::QueryFailed(format!("facts column: {e}")))?;
                let facts = serde_json::from_str(&raw)
                    .map_err(|e| MemoryError::QueryFailed(format!("facts JSON: {e}")))?;
                Ok(UserStats {
                    message_count,
                    facts,
                })
            }
            None => Ok(UserStats::default()),
        }
    }
}
