//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Identifier assigned to an item by the content source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u64);

impl StoryId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A story as reported by the content source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Source-assigned identifier
    pub id: StoryId,
    /// When the story was submitted
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    /// Current score, if reported
    pub score: Option<i64>,
    /// Title, if reported
    pub title: Option<String>,
    /// Top-level comment identifiers, in source order
    #[serde(default)]
    pub comment_ids: Vec<StoryId>,
}

impl Story {
    pub fn comment_count(&self) -> usize {
        self.comment_ids.len()
    }
}

/// Status text ready for publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatus {
    /// The text content
    pub text: String,
    /// Story the status refers to
    pub story_id: StoryId,
}

/// Outcome of ingesting a single identifier from the new-stories list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Story was fetched and stored as pending
    Inserted,
    /// Story was already stored; nothing was done
    AlreadyKnown,
    /// Fetching or storing failed; the identifier will be retried next poll
    Failed { error: String },
}

/// Outcome of publishing a single pending story
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Status was created and the story marked processed
    Posted { status_id: String },
    /// Dry run: the status was rendered but not sent
    DryRun { text: String },
    /// The source no longer serves the story; it was marked processed unposted
    Skipped { reason: String },
    /// Fetching, posting or marking failed; the story stays pending
    Failed { error: String },
}

/// Summary of one full cycle (ingest, publish, trim)
#[derive(Debug, Default)]
pub struct CycleReport {
    pub ingested: Vec<(StoryId, IngestOutcome)>,
    pub published: Vec<(StoryId, PublishOutcome)>,
}

impl CycleReport {
    pub fn inserted_count(&self) -> usize {
        self.ingested
            .iter()
            .filter(|(_, o)| matches!(o, IngestOutcome::Inserted))
            .count()
    }

    pub fn posted_count(&self) -> usize {
        self.published
            .iter()
            .filter(|(_, o)| matches!(o, PublishOutcome::Posted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.published
            .iter()
            .filter(|(_, o)| matches!(o, PublishOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        let ingest_failures = self
            .ingested
            .iter()
            .filter(|(_, o)| matches!(o, IngestOutcome::Failed { .. }))
            .count();
        let publish_failures = self
            .published
            .iter()
            .filter(|(_, o)| matches!(o, PublishOutcome::Failed { .. }))
            .count();
        ingest_failures + publish_failures
    }
}
