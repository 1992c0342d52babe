//! Durable storage of harvested stories.
//!
//! The pipeline only needs two capabilities from storage, captured by
//! [`Store`]. [`SqliteStore`] is the `sqlx`-backed implementation.

use crate::error::StoreError;
use crate::models::Entry;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Persistence boundary used by the scheduler and the handshake.
pub trait Store: Send + Sync {
    /// Insert every entry. A failing row is logged and skipped; the returned
    /// count is the number of rows actually written.
    fn insert_many(
        &self,
        entries: &[Entry],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Number of stories inserted within the trailing `window`.
    fn count_since(
        &self,
        window: Duration,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;
}

/// SQLite-backed story store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create the schema if needed.
    ///
    /// # Example URLs
    /// - `sqlite://hn_pulse.db?mode=rwc` - file, created if missing
    /// - `sqlite::memory:` - ephemeral
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        // An in-memory database is private to its connection.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(database_url, "Story store initialized");
        Ok(store)
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                points TEXT NOT NULL DEFAULT '0',
                author TEXT NOT NULL DEFAULT 'unknown',
                website TEXT NOT NULL DEFAULT '',
                url TEXT,
                content TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stories_created_at ON stories(created_at);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_one(&self, entry: &Entry, created_at: i64) -> Result<(), StoreError> {
        let content = serde_json::to_string(&entry.content)?;
        sqlx::query(
            "INSERT INTO stories (title, points, author, website, url, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.title)
        .bind(&entry.points)
        .bind(&entry.author)
        .bind(&entry.website)
        .bind(entry.url.as_deref().unwrap_or(""))
        .bind(content)
        .bind(created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Store for SqliteStore {
    #[instrument(level = "info", skip_all, fields(count = entries.len()))]
    async fn insert_many(&self, entries: &[Entry]) -> Result<usize, StoreError> {
        let created_at = Utc::now().timestamp_millis();
        let mut saved = 0;
        for entry in entries {
            match self.insert_one(entry, created_at).await {
                Ok(()) => saved += 1,
                Err(e) => error!(title = %entry.title, error = %e, "Error saving story"),
            }
        }
        info!(saved, total = entries.len(), "Saved stories to database");
        Ok(saved)
    }

    async fn count_since(&self, window: Duration) -> Result<i64, StoreError> {
        let cutoff = cutoff_millis(Utc::now().timestamp_millis(), window);
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stories WHERE created_at >= ?")
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Start of the trailing `window` ending at `now_millis`. Windows reaching
/// past the representable range clamp to the earliest timestamp.
fn cutoff_millis(now_millis: i64, window: Duration) -> i64 {
    let window = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    now_millis.saturating_sub(window)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> Entry {
        let mut e = Entry::new(title, Some("3 points".into()), Some("pg".into()), None, None);
        e.content = vec!["para".into()];
        e
    }

    #[tokio::test]
    async fn test_insert_and_count_recent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let saved = store.insert_many(&[entry("a"), entry("b")]).await.unwrap();
        assert_eq!(saved, 2);
        assert_eq!(store.count_since(Duration::from_secs(3600)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_excludes_rows_outside_window() {
        let store = SqliteStore::in_memory().await.unwrap();
        let two_hours_ago = Utc::now().timestamp_millis() - 2 * 3600 * 1000;
        store.insert_one(&entry("old"), two_hours_ago).await.unwrap();
        store.insert_many(&[entry("new")]).await.unwrap();

        assert_eq!(store.count_since(Duration::from_secs(3600)).await.unwrap(), 1);
        assert_eq!(store.count_since(Duration::from_secs(3 * 3600)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_content_stored_as_json_array() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_many(&[entry("a")]).await.unwrap();

        let (content, url): (String, String) =
            sqlx::query_as("SELECT content, url FROM stories LIMIT 1")
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(content, r#"["para"]"#);
        assert_eq!(url, "");
    }

    #[tokio::test]
    async fn test_failing_row_does_not_abort_batch() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_b BEFORE INSERT ON stories \
             WHEN NEW.title = 'b' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let saved = store
            .insert_many(&[entry("a"), entry("b"), entry("c")])
            .await
            .unwrap();
        assert_eq!(saved, 2);
        assert_eq!(store.count_since(Duration::from_secs(3600)).await.unwrap(), 2);

        let titles: Vec<(String,)> = sqlx::query_as("SELECT title FROM stories ORDER BY id")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(titles, vec![("a".to_string(),), ("c".to_string(),)]);
    }

    #[tokio::test]
    async fn test_huge_window_counts_everything() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_one(&entry("ancient"), 0).await.unwrap();
        store.insert_many(&[entry("new")]).await.unwrap();

        let window = Duration::from_secs(9_223_372_036_854_776);
        assert_eq!(store.count_since(window).await.unwrap(), 2);
        assert_eq!(store.count_since(Duration::MAX).await.unwrap(), 2);
    }

    #[test]
    fn test_cutoff_clamps_instead_of_overflowing() {
        assert_eq!(cutoff_millis(10_000, Duration::from_secs(3)), 7_000);
        assert_eq!(cutoff_millis(10_000, Duration::MAX), 10_000 - i64::MAX);
        assert_eq!(cutoff_millis(-10, Duration::MAX), i64::MIN);
    }

    #[tokio::test]
    async fn test_empty_store_counts_zero() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.count_since(Duration::from_secs(300)).await.unwrap(), 0);
        assert_eq!(store.insert_many(&[]).await.unwrap(), 0);
    }
}
