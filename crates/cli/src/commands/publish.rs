//! Publish command - post pending stories once

use anyhow::Result;
use hn_relay_domain::PublishOutcome;
use std::path::PathBuf;

use crate::args::PublishArgs;
use crate::commands::{build_run_loop, log_published};
use crate::config::AppConfig;

pub async fn execute(args: PublishArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let dry_run = args.dry_run || config.general.dry_run;

    // An explicit publish posts even when the loop has publishing turned off
    let run_loop = build_run_loop(&config, dry_run, true).await?;

    let results = run_loop.publish_pending().await?;
    log_published(&results);

    for (story_id, outcome) in &results {
        match outcome {
            PublishOutcome::Posted { status_id } => println!("{}: posted {}", story_id, status_id),
            PublishOutcome::DryRun { text } => println!("{}:\n{}\n", story_id, text),
            PublishOutcome::Skipped { reason } => println!("{}: skipped: {}", story_id, reason),
            PublishOutcome::Failed { error } => println!("{}: failed: {}", story_id, error),
        }
    }

    Ok(())
}
