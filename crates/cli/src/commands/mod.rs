//! Subcommand implementations and the wiring they share

pub mod config;
pub mod doctor;
pub mod poll;
pub mod publish;
pub mod run;
pub mod trim;

use anyhow::{Context, Result, bail};
use hn_relay_adapters::{
    hn::HackerNewsSource,
    poster::{MastodonCredentials, MastodonPoster},
    state::{PostgresStoryRepository, SqliteStoryRepository},
};
use hn_relay_domain::{
    IngestOutcome, PublishOutcome, StoryId, StoryRepository, SystemClock,
    usecases::{RenderConfig, RunLoop, RunLoopConfig},
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::config::{AppConfig, timeout_from_secs};

pub(crate) type AppRunLoop = RunLoop<HackerNewsSource, dyn StoryRepository, MastodonPoster, SystemClock>;

/// Store backend selected by connection string scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DatabaseKind {
    Sqlite,
    Postgres,
}

impl DatabaseKind {
    pub(crate) fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else {
            bail!("Unsupported database URL scheme (expected sqlite: or postgres://)")
        }
    }
}

pub(crate) fn load_secret(env_var: &str, purpose: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No env var configured for {}", purpose);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} for {}", env_var, purpose))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty for {}", env_var, purpose);
    }

    Ok(SecretString::new(value.into()))
}

pub(crate) async fn build_repository(config: &AppConfig) -> Result<Arc<dyn StoryRepository>> {
    let url = load_secret(&config.database.url_env, "database")?;
    let url = url.expose_secret();

    let repository: Arc<dyn StoryRepository> = match DatabaseKind::from_url(url)? {
        DatabaseKind::Sqlite => Arc::new(
            SqliteStoryRepository::connect(url)
                .await
                .context("Failed to open SQLite story repository")?,
        ),
        DatabaseKind::Postgres => Arc::new(
            PostgresStoryRepository::connect(url)
                .await
                .context("Failed to connect to Postgres story repository")?,
        ),
    };

    Ok(repository)
}

pub(crate) fn build_source(config: &AppConfig) -> Result<HackerNewsSource> {
    HackerNewsSource::with_base_url(
        config.source.base_url.clone(),
        timeout_from_secs(config.source.timeout_secs),
    )
    .context("Failed to build Hacker News client")
}

/// Authenticate with Mastodon, or return a disabled poster when not publishing
pub(crate) async fn build_poster(
    config: &AppConfig,
    dry_run: bool,
    publish: bool,
) -> Result<MastodonPoster> {
    if dry_run || !publish {
        return Ok(MastodonPoster::disabled());
    }

    let mastodon = &config.mastodon;
    let credentials = MastodonCredentials {
        client_id: load_secret(&mastodon.client_id_env, "mastodon client id")?
            .expose_secret()
            .to_string(),
        client_secret: load_secret(&mastodon.client_secret_env, "mastodon client secret")?,
        username: load_secret(&mastodon.username_env, "mastodon username")?
            .expose_secret()
            .to_string(),
        password: load_secret(&mastodon.password_env, "mastodon password")?,
    };

    MastodonPoster::connect(
        &mastodon.instance,
        &credentials,
        timeout_from_secs(mastodon.timeout_secs),
    )
    .await
    .context("Failed to authenticate with Mastodon")
}

pub(crate) fn run_loop_config(config: &AppConfig, dry_run: bool) -> RunLoopConfig {
    RunLoopConfig {
        dry_run,
        publish: config.publish.enabled || dry_run,
        min_pending_age: time::Duration::minutes(
            i64::try_from(config.publish.min_age_mins)
                .unwrap_or(i64::MAX)
                .min(i64::MAX / 60),
        ),
        retain_count: (config.database.retain_count > 0).then_some(config.database.retain_count),
        render_config: RenderConfig {
            item_url_base: config.source.item_url_base.clone(),
            max_chars: config.publish.max_chars,
        },
    }
}

pub(crate) async fn build_run_loop(
    config: &AppConfig,
    dry_run: bool,
    publish: bool,
) -> Result<AppRunLoop> {
    let repository = build_repository(config).await?;
    let source = Arc::new(build_source(config)?);
    let poster = Arc::new(build_poster(config, dry_run, publish).await?);

    Ok(RunLoop::new(
        source,
        repository,
        poster,
        Arc::new(SystemClock),
        run_loop_config(config, dry_run),
    ))
}

pub(crate) fn log_ingested(results: &[(StoryId, IngestOutcome)]) {
    for (story_id, outcome) in results {
        match outcome {
            IngestOutcome::Inserted => tracing::info!(story_id = %story_id, "Stored"),
            IngestOutcome::AlreadyKnown => tracing::trace!(story_id = %story_id, "Already known"),
            IngestOutcome::Failed { error } => {
                tracing::warn!(story_id = %story_id, error = %error, "Will retry next poll")
            }
        }
    }
}

pub(crate) fn log_published(results: &[(StoryId, PublishOutcome)]) {
    for (story_id, outcome) in results {
        match outcome {
            PublishOutcome::Posted { status_id } => {
                tracing::info!(story_id = %story_id, status_id = %status_id, "Posted")
            }
            PublishOutcome::DryRun { .. } => tracing::debug!(story_id = %story_id, "Dry run"),
            PublishOutcome::Skipped { reason } => {
                tracing::info!(story_id = %story_id, reason = %reason, "Skipped")
            }
            PublishOutcome::Failed { error } => {
                tracing::warn!(story_id = %story_id, error = %error, "Still pending")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_kind_from_url() {
        assert_eq!(
            DatabaseKind::from_url("sqlite:./stories.sqlite?mode=rwc").unwrap(),
            DatabaseKind::Sqlite
        );
        assert_eq!(
            DatabaseKind::from_url("postgres://u:p@localhost/db").unwrap(),
            DatabaseKind::Postgres
        );
        assert_eq!(
            DatabaseKind::from_url("postgresql://localhost/db").unwrap(),
            DatabaseKind::Postgres
        );
        assert!(DatabaseKind::from_url("mysql://localhost/db").is_err());
    }

    #[test]
    fn test_run_loop_config_from_app_config() {
        let mut config = AppConfig::default();
        config.publish.min_age_mins = 30;
        config.database.retain_count = 0;

        let loop_config = run_loop_config(&config, false);

        assert!(!loop_config.publish);
        assert_eq!(loop_config.min_pending_age, time::Duration::minutes(30));
        assert_eq!(loop_config.retain_count, None);

        let dry = run_loop_config(&config, true);
        assert!(dry.publish);
        assert!(dry.dry_run);
    }
}
