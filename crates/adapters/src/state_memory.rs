//! In-memory story repository, used where persistence across restarts is not needed

use async_trait::async_trait;
use hn_relay_domain::{StoryId, StoryRepoError, StoryRepository};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use time::{Duration, OffsetDateTime};

struct StoredStory {
    id: StoryId,
    submitted_at: OffsetDateTime,
    processed: bool,
}

#[derive(Default)]
struct Tables {
    next_index: u64,
    /// Sequence index -> row
    stories: BTreeMap<u64, StoredStory>,
    /// Story id -> sequence index
    by_id: HashMap<StoryId, u64>,
}

/// In-memory story repository implementation
pub struct InMemoryStoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryStoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_index: 1,
                ..Default::default()
            }),
        }
    }
}

impl Default for InMemoryStoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn insert_story(
        &self,
        id: StoryId,
        submitted_at: OffsetDateTime,
    ) -> Result<(), StoryRepoError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StoryRepoError::Database(e.to_string()))?;

        if tables.by_id.contains_key(&id) {
            return Err(StoryRepoError::Duplicate(id));
        }

        let index = tables.next_index;
        tables.next_index += 1;
        tables.by_id.insert(id, index);
        tables.stories.insert(
            index,
            StoredStory {
                id,
                submitted_at,
                processed: false,
            },
        );
        Ok(())
    }

    async fn has_story(&self, id: StoryId) -> Result<bool, StoryRepoError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StoryRepoError::Database(e.to_string()))?;
        Ok(tables.by_id.contains_key(&id))
    }

    async fn mark_story(&self, id: StoryId, processed: bool) -> Result<(), StoryRepoError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StoryRepoError::Database(e.to_string()))?;

        if let Some(index) = tables.by_id.get(&id).copied() {
            if let Some(story) = tables.stories.get_mut(&index) {
                story.processed = processed;
            }
        }
        Ok(())
    }

    async fn delete_stale_stories(&self, keep_count: u64) -> Result<(), StoryRepoError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StoryRepoError::Database(e.to_string()))?;

        let Some(highest) = tables.stories.keys().next_back().copied() else {
            return Ok(());
        };
        let Some(threshold) = highest.checked_sub(keep_count) else {
            return Ok(());
        };

        let kept = tables.stories.split_off(&(threshold + 1));
        let stale = std::mem::replace(&mut tables.stories, kept);
        for story in stale.values() {
            tables.by_id.remove(&story.id);
        }
        Ok(())
    }

    async fn pending_stories(&self, min_age: Duration) -> Result<Vec<StoryId>, StoryRepoError> {
        let cutoff = OffsetDateTime::now_utc() - min_age;
        let tables = self
            .tables
            .read()
            .map_err(|e| StoryRepoError::Database(e.to_string()))?;

        Ok(tables
            .stories
            .values()
            .filter(|s| !s.processed && s.submitted_at <= cutoff)
            .map(|s| s.id)
            .collect())
    }
}
