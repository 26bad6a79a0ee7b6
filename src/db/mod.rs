mod members;
mod polls;
mod posts;

use crate::error::{BoardError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        // Create the database file if it doesn't exist
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;
        info!("Connected to database at {}", database_url);

        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every connection would otherwise
    /// see its own empty database.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        Self::connect("sqlite::memory:", 1)
            .await
            .expect("in-memory database")
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                teams TEXT NOT NULL,
                created_at TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // At most one active poll; lets fetch-or-initialize be a plain conditional insert
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS polls_single_active
            ON polls (is_active) WHERE is_active = TRUE;
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                poll_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                team_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (poll_id, user_id),
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                profile_pic_url TEXT,
                unlocked_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                media_urls TEXT NOT NULL DEFAULT '[]',
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS likes (
                post_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (post_id, user_id),
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// Fixed-width RFC 3339 so that text order is time order.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| BoardError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    // Round-trip so values compare equal after a read back
    parse_timestamp(&format_timestamp(now)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let early = parse_timestamp("2025-07-11T08:00:00.5Z").unwrap();
        let late = parse_timestamp("2025-07-11T08:00:01Z").unwrap();
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(format_timestamp(late), "2025-07-11T08:00:01.000000Z");
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(BoardError::Timestamp { .. })
        ));
    }

    #[tokio::test]
    async fn schema_init_is_repeatable() {
        let db = Database::in_memory().await;
        Database::init_schema(&db.pool).await.unwrap();
    }
}
