//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::model::{RenderedStatus, Story, StoryId};

/// Error type for content source operations
#[derive(Debug, Error)]
pub enum StorySourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Story {0} not found")]
    NotFound(StoryId),
}

/// Port for reading stories from the content source
#[async_trait]
pub trait StorySource: Send + Sync {
    /// Fetch the current list of newest story identifiers, verbatim
    async fn new_story_ids(&self) -> Result<Vec<StoryId>, StorySourceError>;

    /// Fetch the detail of a single story
    async fn fetch_story(&self, id: StoryId) -> Result<Story, StorySourceError>;
}

/// Error type for story repository operations
#[derive(Debug, Error)]
pub enum StoryRepoError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Story {0} already stored")]
    Duplicate(StoryId),
    #[error("Story id {0} does not fit the store's key type")]
    InvalidId(StoryId),
}

/// Port for persisting seen stories and their processing status
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Store a newly seen story as pending
    ///
    /// Fails with [`StoryRepoError::Duplicate`] if the id is already stored.
    async fn insert_story(
        &self,
        id: StoryId,
        submitted_at: OffsetDateTime,
    ) -> Result<(), StoryRepoError>;

    /// Check whether a story has been stored
    async fn has_story(&self, id: StoryId) -> Result<bool, StoryRepoError>;

    /// Set the processed flag; unknown ids are ignored
    async fn mark_story(&self, id: StoryId, processed: bool) -> Result<(), StoryRepoError>;

    /// Keep only the `keep_count` most recently inserted stories
    async fn delete_stale_stories(&self, keep_count: u64) -> Result<(), StoryRepoError>;

    /// Unprocessed stories submitted at least `min_age` ago, in no particular order
    async fn pending_stories(&self, min_age: Duration) -> Result<Vec<StoryId>, StoryRepoError>;
}

/// Error type for poster operations
#[derive(Debug, Error)]
pub enum PostError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Result of a successful post
#[derive(Debug, Clone)]
pub struct PostReceipt {
    /// Platform-specific status ID
    pub id: String,
    /// URL to the published status, if available
    pub url: Option<String>,
}

/// Port for publishing rendered statuses
#[async_trait]
pub trait StoryPoster: Send + Sync {
    /// Publish a rendered status
    async fn post(&self, status: &RenderedStatus) -> Result<PostReceipt, PostError>;

    /// Check if this poster is enabled
    fn is_enabled(&self) -> bool;

    /// Get the platform name (e.g., "mastodon")
    fn platform(&self) -> &'static str;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
