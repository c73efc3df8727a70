//! Run loop use case - orchestrates polling, storing, and publishing stories

use std::sync::Arc;
use time::Duration;

use crate::{
    model::{CycleReport, IngestOutcome, PublishOutcome, StoryId},
    ports::{Clock, StoryPoster, StoryRepository, StorySource, StorySourceError},
    usecases::render::{RenderConfig, Renderer},
};

/// Configuration for the run loop
#[derive(Debug, Clone)]
pub struct RunLoopConfig {
    /// Dry run mode (render but don't post or mark)
    pub dry_run: bool,
    /// Whether `run_cycle` publishes pending stories
    pub publish: bool,
    /// Minimum story age before it is published
    pub min_pending_age: Duration,
    /// Stories to keep when trimming (None = never trim)
    pub retain_count: Option<u64>,
    /// Render config
    pub render_config: RenderConfig,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            publish: false,
            min_pending_age: Duration::ZERO,
            retain_count: None,
            render_config: RenderConfig::default(),
        }
    }
}

/// Run loop orchestrator
pub struct RunLoop<S, R, P, Cl>
where
    S: StorySource + ?Sized,
    R: StoryRepository + ?Sized,
    P: StoryPoster + ?Sized,
    Cl: Clock + ?Sized,
{
    source: Arc<S>,
    repository: Arc<R>,
    poster: Arc<P>,
    clock: Arc<Cl>,
    renderer: Renderer,
    config: RunLoopConfig,
}

impl<S, R, P, Cl> RunLoop<S, R, P, Cl>
where
    S: StorySource + ?Sized,
    R: StoryRepository + ?Sized,
    P: StoryPoster + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        source: Arc<S>,
        repository: Arc<R>,
        poster: Arc<P>,
        clock: Arc<Cl>,
        config: RunLoopConfig,
    ) -> Self {
        let renderer = Renderer::new(config.render_config.clone());
        Self {
            source,
            repository,
            poster,
            clock,
            renderer,
            config,
        }
    }

    /// Ingest, publish (if enabled), then trim
    pub async fn run_cycle(&self) -> Result<CycleReport, RunLoopError> {
        let ingested = self.poll_once().await?;

        let published = if self.config.publish {
            self.publish_pending().await?
        } else {
            vec![]
        };

        self.trim().await?;

        Ok(CycleReport {
            ingested,
            published,
        })
    }

    /// Store every identifier on the new-stories list that hasn't been seen yet
    ///
    /// Failures for a single identifier are logged and recorded; only a failure to
    /// fetch the list itself aborts the poll.
    pub async fn poll_once(&self) -> Result<Vec<(StoryId, IngestOutcome)>, RunLoopError> {
        let ids = self
            .source
            .new_story_ids()
            .await
            .map_err(|e| RunLoopError::Source(e.to_string()))?;

        tracing::info!(count = ids.len(), "Fetched new story ids");

        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let outcome = match self.ingest_story(id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(story_id = %id, error = %e, "Failed to ingest story");
                    IngestOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push((id, outcome));
        }

        Ok(results)
    }

    async fn ingest_story(&self, id: StoryId) -> Result<IngestOutcome, RunLoopError> {
        if self
            .repository
            .has_story(id)
            .await
            .map_err(|e| RunLoopError::Repository(e.to_string()))?
        {
            return Ok(IngestOutcome::AlreadyKnown);
        }

        let story = self
            .source
            .fetch_story(id)
            .await
            .map_err(|e| RunLoopError::Source(e.to_string()))?;

        self.repository
            .insert_story(story.id, story.submitted_at)
            .await
            .map_err(|e| RunLoopError::Repository(e.to_string()))?;

        tracing::debug!(story_id = %id, title = ?story.title, "Stored new story");

        Ok(IngestOutcome::Inserted)
    }

    /// Post every pending story old enough and mark it processed
    pub async fn publish_pending(&self) -> Result<Vec<(StoryId, PublishOutcome)>, RunLoopError> {
        if !self.config.dry_run && !self.poster.is_enabled() {
            tracing::debug!(platform = self.poster.platform(), "Poster disabled, skipping publish");
            return Ok(vec![]);
        }

        let mut ids = self
            .repository
            .pending_stories(self.config.min_pending_age)
            .await
            .map_err(|e| RunLoopError::Repository(e.to_string()))?;
        ids.sort();

        tracing::info!(count = ids.len(), "Publishing pending stories");

        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let outcome = match self.publish_story(id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(story_id = %id, error = %e, "Failed to publish story");
                    PublishOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push((id, outcome));
        }

        Ok(results)
    }

    async fn publish_story(&self, id: StoryId) -> Result<PublishOutcome, RunLoopError> {
        let story = match self.source.fetch_story(id).await {
            Ok(story) => story,
            // Deleted upstream; retrying every cycle would never succeed
            Err(StorySourceError::NotFound(_)) => return self.skip_story(id).await,
            Err(e) => return Err(RunLoopError::Source(e.to_string())),
        };

        let status = self.renderer.render(&story, self.clock.now());

        if self.config.dry_run {
            tracing::info!(
                story_id = %id,
                rendered_text = %status.text,
                "[DRY RUN] Would publish"
            );
            return Ok(PublishOutcome::DryRun { text: status.text });
        }

        let receipt = self
            .poster
            .post(&status)
            .await
            .map_err(|e| RunLoopError::Poster(e.to_string()))?;

        tracing::info!(
            story_id = %id,
            status_id = %receipt.id,
            url = ?receipt.url,
            platform = self.poster.platform(),
            "Published story"
        );

        self.repository
            .mark_story(id, true)
            .await
            .map_err(|e| RunLoopError::Repository(e.to_string()))?;

        Ok(PublishOutcome::Posted {
            status_id: receipt.id,
        })
    }

    async fn skip_story(&self, id: StoryId) -> Result<PublishOutcome, RunLoopError> {
        let reason = "no longer served by the source".to_string();

        if self.config.dry_run {
            tracing::info!(story_id = %id, "[DRY RUN] Would skip vanished story");
        } else {
            self.repository
                .mark_story(id, true)
                .await
                .map_err(|e| RunLoopError::Repository(e.to_string()))?;
            tracing::warn!(story_id = %id, "Story vanished from source, marked processed");
        }

        Ok(PublishOutcome::Skipped { reason })
    }

    /// Drop stories outside the retention window
    pub async fn trim(&self) -> Result<(), RunLoopError> {
        let Some(keep_count) = self.config.retain_count else {
            return Ok(());
        };

        self.repository
            .delete_stale_stories(keep_count)
            .await
            .map_err(|e| RunLoopError::Repository(e.to_string()))?;

        tracing::debug!(keep_count, "Trimmed stale stories");
        Ok(())
    }
}

/// Errors from the run loop
#[derive(Debug, thiserror::Error)]
pub enum RunLoopError {
    #[error("Story source error: {0}")]
    Source(String),
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("Poster error: {0}")]
    Poster(String),
}
