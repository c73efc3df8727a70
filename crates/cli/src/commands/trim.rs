//! Trim command - delete stories outside the retention window

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use crate::args::TrimArgs;
use crate::commands::build_repository;
use crate::config::AppConfig;

pub async fn execute(args: TrimArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let keep = match args.keep {
        Some(keep) => keep,
        None if config.database.retain_count > 0 => config.database.retain_count,
        None => bail!("Trimming is disabled (database.retain_count = 0); pass --keep"),
    };

    let repository = build_repository(&config).await?;
    repository
        .delete_stale_stories(keep)
        .await
        .context("Failed to delete stale stories")?;

    tracing::info!(keep, "Trimmed story repository");
    println!("Kept the {} most recent stories", keep);

    Ok(())
}
