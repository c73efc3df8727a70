//! Hacker News API adapter for reading stories
//!
//! See <https://github.com/HackerNews/API>.

use async_trait::async_trait;
use hn_relay_domain::{Story, StoryId, StorySource, StorySourceError};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Hacker News Firebase API client
pub struct HackerNewsSource {
    client: Client,
    base_url: String,
}

impl HackerNewsSource {
    pub fn new(timeout: Option<Duration>) -> Result<Self, StorySourceError> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), timeout)
    }

    pub fn with_base_url(
        base_url: String,
        timeout: Option<Duration>,
    ) -> Result<Self, StorySourceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StorySourceError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<Response, StorySourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorySourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorySourceError::Api(format!("{} from {}: {}", status, url, body)));
        }

        Ok(response)
    }
}

/// Item detail; every field but `time` may be missing
#[derive(Deserialize)]
struct ItemResponse {
    time: i64,
    #[serde(default)]
    kids: Vec<u64>,
    score: Option<i64>,
    title: Option<String>,
}

impl ItemResponse {
    fn into_story(self, id: StoryId) -> Result<Story, StorySourceError> {
        let submitted_at = OffsetDateTime::from_unix_timestamp(self.time)
            .map_err(|e| StorySourceError::Decode(format!("Invalid time {}: {}", self.time, e)))?;

        Ok(Story {
            id,
            submitted_at,
            score: self.score,
            title: self.title,
            comment_ids: self.kids.into_iter().map(StoryId).collect(),
        })
    }
}

#[async_trait]
impl StorySource for HackerNewsSource {
    async fn new_story_ids(&self) -> Result<Vec<StoryId>, StorySourceError> {
        let url = format!("{}/newstories.json", self.base_url);

        let ids: Vec<u64> = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| StorySourceError::Decode(e.to_string()))?;

        tracing::debug!(count = ids.len(), "Fetched new story list");

        Ok(ids.into_iter().map(StoryId).collect())
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Story, StorySourceError> {
        let url = format!("{}/item/{}.json", self.base_url, id);

        // Unknown items come back as a literal `null`
        let item: Option<ItemResponse> = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| StorySourceError::Decode(e.to_string()))?;

        item.ok_or(StorySourceError::NotFound(id))?.into_story(id)
    }
}
