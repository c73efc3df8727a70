//! Poll command - store unseen stories once

use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{build_run_loop, log_ingested};
use crate::config::AppConfig;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let run_loop = build_run_loop(&config, false, false).await?;

    let results = run_loop.poll_once().await?;
    log_ingested(&results);

    let inserted = results
        .iter()
        .filter(|(_, o)| matches!(o, hn_relay_domain::IngestOutcome::Inserted))
        .count();
    println!("Polled {} ids, stored {} new stories", results.len(), inserted);

    Ok(())
}
