//! Rendering use case - turns a story into status text

use time::OffsetDateTime;

use crate::model::{RenderedStatus, Story};

const UNTITLED: &str = "[untitled]";
const ELLIPSIS: char = '…';

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Prefix the story id is appended to for the permalink
    pub item_url_base: String,
    /// Maximum characters for a status
    ///
    /// Only the title is shortened to fit. The counts, age and link are never cut,
    /// so a limit below their length yields an untitled status that still exceeds it.
    pub max_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            item_url_base: "https://news.ycombinator.com/item?id=".to_string(),
            max_chars: 500,
        }
    }
}

/// Renderer for status text
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a story as seen at `now`
    pub fn render(&self, story: &Story, now: OffsetDateTime) -> RenderedStatus {
        let body = format!(
            "{} comments {} points\n(in {} minutes)\n\n{}{}",
            story.comment_count(),
            story.score.unwrap_or(0),
            age_in_minutes(story.submitted_at, now),
            self.config.item_url_base,
            story.id
        );

        let title = story.title.as_deref().unwrap_or(UNTITLED);
        // Title plus the blank line separating it from the body
        let available = self
            .config
            .max_chars
            .saturating_sub(body.chars().count() + 2);
        let title = truncate_to_length(title, available);

        RenderedStatus {
            text: format!("{}\n\n{}", title, body),
            story_id: story.id,
        }
    }
}

/// Minutes between submission and `now`, rounded to the nearest minute
pub fn age_in_minutes(submitted_at: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let seconds = (now - submitted_at).whole_seconds().max(0);
    (seconds + 30) / 60
}

fn truncate_to_length(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len == 0 {
        return String::new();
    }

    let mut truncated: String = text.chars().take(max_len - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StoryId;
    use time::Duration;
    use time::macros::datetime;

    fn sample_story() -> Story {
        Story {
            id: StoryId(8863),
            submitted_at: datetime!(2024-01-15 12:00:00 UTC),
            score: Some(111),
            title: Some("My YC app: Dropbox".to_string()),
            comment_ids: vec![StoryId(9224), StoryId(8917), StoryId(8952)],
        }
    }

    #[test]
    fn test_render_fixed_template() {
        let renderer = Renderer::new(RenderConfig::default());
        let now = datetime!(2024-01-15 12:42:10 UTC);

        let status = renderer.render(&sample_story(), now);

        assert_eq!(
            status.text,
            "My YC app: Dropbox\n\n3 comments 111 points\n(in 42 minutes)\n\nhttps://news.ycombinator.com/item?id=8863"
        );
        assert_eq!(status.story_id, StoryId(8863));
    }

    #[test]
    fn test_render_missing_fields() {
        let renderer = Renderer::new(RenderConfig::default());
        let story = Story {
            score: None,
            title: None,
            comment_ids: vec![],
            ..sample_story()
        };

        let status = renderer.render(&story, story.submitted_at);

        assert!(status.text.starts_with("[untitled]\n\n0 comments 0 points\n(in 0 minutes)"));
    }

    #[test]
    fn test_age_rounds_to_nearest_minute() {
        let submitted = datetime!(2024-01-15 12:00:00 UTC);

        assert_eq!(age_in_minutes(submitted, submitted + Duration::seconds(29)), 0);
        assert_eq!(age_in_minutes(submitted, submitted + Duration::seconds(30)), 1);
        assert_eq!(age_in_minutes(submitted, submitted + Duration::seconds(89)), 1);
        assert_eq!(age_in_minutes(submitted, submitted + Duration::seconds(90)), 2);
    }

    #[test]
    fn test_age_clamps_clock_skew() {
        let submitted = datetime!(2024-01-15 12:00:00 UTC);
        assert_eq!(age_in_minutes(submitted, submitted - Duration::minutes(5)), 0);
    }

    #[test]
    fn test_long_title_is_truncated() {
        let renderer = Renderer::new(RenderConfig {
            max_chars: 120,
            ..Default::default()
        });
        let story = Story {
            title: Some("x".repeat(300)),
            ..sample_story()
        };

        let status = renderer.render(&story, story.submitted_at);

        assert_eq!(status.text.chars().count(), 120);
        assert!(status.text.contains('…'));
        assert!(status.text.ends_with("item?id=8863"));
    }

    #[test]
    fn test_limit_below_body_drops_title_only() {
        let renderer = Renderer::new(RenderConfig {
            max_chars: 10,
            ..Default::default()
        });

        let status = renderer.render(&sample_story(), sample_story().submitted_at);

        assert_eq!(
            status.text,
            "\n\n3 comments 111 points\n(in 0 minutes)\n\nhttps://news.ycombinator.com/item?id=8863"
        );
    }
}
