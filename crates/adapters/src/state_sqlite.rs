//! SQLite story repository implementation

use async_trait::async_trait;
use hn_relay_domain::{StoryId, StoryRepoError, StoryRepository};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::{Duration, OffsetDateTime};

use crate::db_error;

/// SQLite-backed story repository
pub struct SqliteStoryRepository {
    pool: SqlitePool,
}

impl SqliteStoryRepository {
    /// Open (creating if needed) a database file
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, StoryRepoError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoryRepoError::Database(format!("Failed to create directory: {}", e))
            })?;
        }

        Self::connect(&format!("sqlite:{}?mode=rwc", db_path.display())).await
    }

    /// Connect using a `sqlite:` connection string
    pub async fn connect(url: &str) -> Result<Self, StoryRepoError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(db_error)?;

        let repo = Self { pool };
        repo.run_migrations().await?;

        Ok(repo)
    }

    /// Create an in-memory SQLite repository (for testing)
    pub async fn in_memory() -> Result<Self, StoryRepoError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), StoryRepoError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS story (
                "index" INTEGER PRIMARY KEY AUTOINCREMENT,
                id INTEGER NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        // Unix seconds, so the pending query can compare numerically
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS story_submission_time (
                "index" INTEGER PRIMARY KEY,
                submitted_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS story_processing_status (
                "index" INTEGER PRIMARY KEY,
                processed BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }
}

fn to_db_id(id: StoryId) -> Result<i64, StoryRepoError> {
    i64::try_from(id.get()).map_err(|_| StoryRepoError::InvalidId(id))
}

#[async_trait]
impl StoryRepository for SqliteStoryRepository {
    async fn insert_story(
        &self,
        id: StoryId,
        submitted_at: OffsetDateTime,
    ) -> Result<(), StoryRepoError> {
        let db_id = to_db_id(id)?;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let index: i64 = sqlx::query_scalar(r#"INSERT INTO story (id) VALUES (?) RETURNING "index""#)
            .bind(db_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    StoryRepoError::Duplicate(id)
                }
                other => db_error(other),
            })?;

        sqlx::query(r#"INSERT INTO story_submission_time ("index", submitted_at) VALUES (?, ?)"#)
            .bind(index)
            .bind(submitted_at.unix_timestamp())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        sqlx::query(r#"INSERT INTO story_processing_status ("index", processed) VALUES (?, ?)"#)
            .bind(index)
            .bind(false)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(())
    }

    async fn has_story(&self, id: StoryId) -> Result<bool, StoryRepoError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM story WHERE id = ?")
            .bind(to_db_id(id)?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(count.0 > 0)
    }

    async fn mark_story(&self, id: StoryId, processed: bool) -> Result<(), StoryRepoError> {
        sqlx::query(
            r#"
            UPDATE story_processing_status
            SET processed = ?
            WHERE "index" IN (SELECT "index" FROM story WHERE id = ?)
            "#,
        )
        .bind(processed)
        .bind(to_db_id(id)?)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete_stale_stories(&self, keep_count: u64) -> Result<(), StoryRepoError> {
        let highest: Option<i64> = sqlx::query_scalar(r#"SELECT MAX("index") FROM story"#)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let Some(highest) = highest else {
            return Ok(());
        };
        let threshold = highest.saturating_sub(i64::try_from(keep_count).unwrap_or(i64::MAX));

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for statement in [
            r#"DELETE FROM story WHERE "index" <= ?"#,
            r#"DELETE FROM story_submission_time WHERE "index" <= ?"#,
            r#"DELETE FROM story_processing_status WHERE "index" <= ?"#,
        ] {
            sqlx::query(statement)
                .bind(threshold)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(threshold, "Deleted stale stories");
        Ok(())
    }

    async fn pending_stories(&self, min_age: Duration) -> Result<Vec<StoryId>, StoryRepoError> {
        let cutoff = (OffsetDateTime::now_utc() - min_age).unix_timestamp();

        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT story.id
            FROM story
            JOIN story_submission_time ON story_submission_time."index" = story."index"
            JOIN story_processing_status ON story_processing_status."index" = story."index"
            WHERE story_submission_time.submitted_at <= ?
              AND NOT story_processing_status.processed
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(ids.into_iter().map(|id| StoryId(id as u64)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_ago(minutes: i64) -> OffsetDateTime {
        OffsetDateTime::now_utc() - Duration::minutes(minutes)
    }

    async fn table_count(repo: &SqliteStoryRepository, table: &str) -> i64 {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        count.0
    }

    #[tokio::test]
    async fn test_insert_creates_all_rows() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();

        repo.insert_story(StoryId(101), minutes_ago(3)).await.unwrap();

        assert!(repo.has_story(StoryId(101)).await.unwrap());
        assert!(!repo.has_story(StoryId(102)).await.unwrap());
        assert_eq!(table_count(&repo, "story").await, 1);
        assert_eq!(table_count(&repo, "story_submission_time").await, 1);
        assert_eq!(table_count(&repo, "story_processing_status").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails_without_partial_rows() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();
        repo.insert_story(StoryId(101), minutes_ago(3)).await.unwrap();

        let result = repo.insert_story(StoryId(101), minutes_ago(3)).await;

        assert!(matches!(result, Err(StoryRepoError::Duplicate(StoryId(101)))));
        assert_eq!(table_count(&repo, "story_submission_time").await, 1);
        assert_eq!(table_count(&repo, "story_processing_status").await, 1);
    }

    #[tokio::test]
    async fn test_mark_excludes_from_pending() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();
        repo.insert_story(StoryId(1), minutes_ago(10)).await.unwrap();
        repo.insert_story(StoryId(2), minutes_ago(10)).await.unwrap();

        repo.mark_story(StoryId(1), true).await.unwrap();

        let pending = repo.pending_stories(Duration::ZERO).await.unwrap();
        assert_eq!(pending, vec![StoryId(2)]);

        repo.mark_story(StoryId(1), false).await.unwrap();
        let mut pending = repo.pending_stories(Duration::ZERO).await.unwrap();
        pending.sort();
        assert_eq!(pending, vec![StoryId(1), StoryId(2)]);
    }

    #[tokio::test]
    async fn test_pending_respects_min_age() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();
        repo.insert_story(StoryId(1), minutes_ago(45)).await.unwrap();
        repo.insert_story(StoryId(2), minutes_ago(2)).await.unwrap();

        let pending = repo.pending_stories(Duration::minutes(30)).await.unwrap();

        assert_eq!(pending, vec![StoryId(1)]);
    }

    #[tokio::test]
    async fn test_mark_unknown_is_noop() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();
        repo.insert_story(StoryId(1), minutes_ago(1)).await.unwrap();

        repo.mark_story(StoryId(999), true).await.unwrap();

        assert_eq!(
            repo.pending_stories(Duration::ZERO).await.unwrap(),
            vec![StoryId(1)]
        );
    }

    #[tokio::test]
    async fn test_delete_stale_trims_all_tables() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();
        for id in [10, 20, 30, 40, 50] {
            repo.insert_story(StoryId(id), minutes_ago(1)).await.unwrap();
        }

        repo.delete_stale_stories(2).await.unwrap();

        assert_eq!(table_count(&repo, "story").await, 2);
        assert_eq!(table_count(&repo, "story_submission_time").await, 2);
        assert_eq!(table_count(&repo, "story_processing_status").await, 2);
        assert!(!repo.has_story(StoryId(30)).await.unwrap());
        assert!(repo.has_story(StoryId(40)).await.unwrap());
        assert!(repo.has_story(StoryId(50)).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_stale_noop_when_empty_or_within_window() {
        let repo = SqliteStoryRepository::in_memory().await.unwrap();
        repo.delete_stale_stories(3).await.unwrap();

        repo.insert_story(StoryId(1), minutes_ago(1)).await.unwrap();
        repo.delete_stale_stories(3).await.unwrap();

        assert!(repo.has_story(StoryId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stories.sqlite");

        {
            let repo = SqliteStoryRepository::open(&path).await.unwrap();
            repo.insert_story(StoryId(7), minutes_ago(1)).await.unwrap();
            repo.pool.close().await;
        }

        let reopened = SqliteStoryRepository::open(&path).await.unwrap();
        assert!(reopened.has_story(StoryId(7)).await.unwrap());
    }
}
