//! SQLite fact store.
//!
//! One row per user in `user_memory`; the fact mapping itself is a JSON blob
//! so a fact upsert is a read-modify-write of one row. `last_seen` and
//! `total_messages` are maintained for observability and never read back
//! into prompts.

use async_trait::async_trait;
use bumblebot_core::error::MemoryError;
use bumblebot_core::facts::{FactMap, FactStore, UserFact};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable SQLite-backed [`FactStore`].
pub struct SqliteFactStore {
    pool: SqlitePool,
}

impl SqliteFactStore {
    /// Create a new store from a SQLite path.
    ///
    /// The database and schema are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
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
        info!("Fact store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_memory (
                user_id        INTEGER PRIMARY KEY,
                facts          TEXT NOT NULL DEFAULT '{}',
                last_seen      TEXT NOT NULL,
                total_messages INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("user_memory table: {e}")))?;

        debug!("Fact store migrations complete");
        Ok(())
    }

    async fn load_facts(&self, user_id: i64) -> Result<FactMap, MemoryError> {
        let row = sqlx::query("SELECT facts FROM user_memory WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("facts lookup: {e}")))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("facts")
                    .map_err(|e| MemoryError::QueryFailed(format!("facts column: {e}")))?;
                serde_json::from_str(&raw)
                    .map_err(|e| MemoryError::QueryFailed(format!("facts JSON: {e}")))
            }
            None => Ok(FactMap::new()),
        }
    }
}

#[async_trait]
impl FactStore for SqliteFactStore {
    async fn remember_fact(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), MemoryError> {
        let mut facts = self.load_facts(user_id).await?;
        facts.insert(key.to_string(), UserFact::now(value));

        let facts_json = serde_json::to_string(&facts)
            .map_err(|e| MemoryError::Storage(format!("facts serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO user_memory (user_id, facts, last_seen, total_messages)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(user_id) DO UPDATE SET
                facts = excluded.facts,
                last_seen = excluded.last_seen,
                total_messages = user_memory.total_messages + 1
            "#,
        )
        .bind(user_id)
        .bind(&facts_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("fact upsert: {e}")))?;

        info!(user_id, key, value, "Remembered fact");
        Ok(())
    }

    async fn user_facts(&self, user_id: i64) -> Result<FactMap, MemoryError> {
        self.load_facts(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteFactStore {
        SqliteFactStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn remember_and_retrieve() {
        let store = test_store().await;
        store.remember_fact(1, "name", "Мария").await.unwrap();

        let facts = store.user_facts(1).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["name"].value, "Мария");
    }

    #[tokio::test]
    async fn unknown_user_has_empty_map() {
        let store = test_store().await;
        assert!(store.user_facts(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_write_wins_per_key() {
        let store = test_store().await;
        store.remember_fact(1, "city", "Paris").await.unwrap();
        let first = store.user_facts(1).await.unwrap()["city"].clone();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.remember_fact(1, "city", "Lyon").await.unwrap();

        let facts = store.user_facts(1).await.unwrap();
        assert_eq!(facts["city"].value, "Lyon");
        assert!(facts["city"].updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = test_store().await;
        store.remember_fact(1, "name", "Боб").await.unwrap();
        store.remember_fact(1, "city", "Тверь").await.unwrap();
        store.remember_fact(2, "name", "Ева").await.unwrap();

        let facts = store.user_facts(1).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts["name"].value, "Боб");
        assert_eq!(store.user_facts(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_identical_write_is_idempotent() {
        let store = test_store().await;
        store.remember_fact(1, "interest", "шахматы").await.unwrap();
        store.remember_fact(1, "interest", "шахматы").await.unwrap();

        let facts = store.user_facts(1).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["interest"].value, "шахматы");
    }

    #[tokio::test]
    async fn upsert_tracks_message_count() {
        let store = test_store().await;
        store.remember_fact(7, "name", "Ян").await.unwrap();
        store.remember_fact(7, "city", "Уфа").await.unwrap();
        store.remember_fact(7, "city", "Омск").await.unwrap();

        let row = sqlx::query("SELECT total_messages FROM user_memory WHERE user_id = 7")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let count: i64 = row.try_get("total_messages").unwrap();
        assert_eq!(count, 3);
    }
}
