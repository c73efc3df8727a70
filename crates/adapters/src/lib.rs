//! hn-relay adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `hn`: Hacker News API story source
//! - `mastodon`: Mastodon status poster
//! - `state`: SQLite, Postgres and in-memory story repositories

mod hn_api;
mod mastodon;
mod state_memory;
mod state_postgres;
mod state_sqlite;

use hn_relay_domain::StoryRepoError;

/// Re-exports for the Hacker News adapter
pub mod hn {
    pub use crate::hn_api::{DEFAULT_BASE_URL, HackerNewsSource};
}

/// Re-exports for the Mastodon adapter
pub mod poster {
    pub use crate::mastodon::{MastodonCredentials, MastodonPoster};
}

/// Re-exports for story repositories
pub mod state {
    pub use crate::state_memory::InMemoryStoryRepository;
    pub use crate::state_postgres::PostgresStoryRepository;
    pub use crate::state_sqlite::SqliteStoryRepository;
}

pub(crate) fn db_error(e: sqlx::Error) -> StoryRepoError {
    StoryRepoError::Database(e.to_string())
}
