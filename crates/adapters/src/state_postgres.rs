//! Postgres story repository implementation

use async_trait::async_trait;
use hn_relay_domain::{StoryId, StoryRepoError, StoryRepository};
use sqlx::{PgPool, postgres::PgPoolOptions};
use time::{Duration, OffsetDateTime};

use crate::db_error;

/// Postgres-backed story repository
pub struct PostgresStoryRepository {
    pool: PgPool,
}

impl PostgresStoryRepository {
    /// Connect using a `postgres://` connection string and ensure the schema exists
    pub async fn connect(url: &str) -> Result<Self, StoryRepoError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(db_error)?;

        let repo = Self { pool };
        repo.run_migrations().await?;

        Ok(repo)
    }

    async fn run_migrations(&self) -> Result<(), StoryRepoError> {
        for statement in [
            r#"
            CREATE TABLE IF NOT EXISTS story (
                "index" BIGSERIAL PRIMARY KEY,
                id BIGINT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS story_submission_time (
                "index" BIGINT PRIMARY KEY,
                submitted_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS story_processing_status (
                "index" BIGINT PRIMARY KEY,
                processed BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }

        Ok(())
    }
}

fn to_db_id(id: StoryId) -> Result<i64, StoryRepoError> {
    i64::try_from(id.get()).map_err(|_| StoryRepoError::InvalidId(id))
}

#[async_trait]
impl StoryRepository for PostgresStoryRepository {
    async fn insert_story(
        &self,
        id: StoryId,
        submitted_at: OffsetDateTime,
    ) -> Result<(), StoryRepoError> {
        let db_id = to_db_id(id)?;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let index: i64 =
            sqlx::query_scalar(r#"INSERT INTO story (id) VALUES ($1) RETURNING "index""#)
                .bind(db_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                        StoryRepoError::Duplicate(id)
                    }
                    other => db_error(other),
                })?;

        sqlx::query(r#"INSERT INTO story_submission_time ("index", submitted_at) VALUES ($1, $2)"#)
            .bind(index)
            .bind(submitted_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        sqlx::query(
            r#"INSERT INTO story_processing_status ("index", processed) VALUES ($1, FALSE)"#,
        )
        .bind(index)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(())
    }

    async fn has_story(&self, id: StoryId) -> Result<bool, StoryRepoError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM story WHERE id = $1)")
            .bind(to_db_id(id)?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(exists)
    }

    async fn mark_story(&self, id: StoryId, processed: bool) -> Result<(), StoryRepoError> {
        sqlx::query(
            r#"
            UPDATE story_processing_status
            SET processed = $1
            FROM story
            WHERE story."index" = story_processing_status."index" AND story.id = $2
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
            r#"DELETE FROM story WHERE "index" <= $1"#,
            r#"DELETE FROM story_submission_time WHERE "index" <= $1"#,
            r#"DELETE FROM story_processing_status WHERE "index" <= $1"#,
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
        let cutoff = OffsetDateTime::now_utc() - min_age;

        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT story.id
            FROM story
            JOIN story_submission_time ON story_submission_time."index" = story."index"
            JOIN story_processing_status ON story_processing_status."index" = story."index"
            WHERE story_submission_time.submitted_at <= $1
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
