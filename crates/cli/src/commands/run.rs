//! Run command - poll, publish, and trim loop

use anyhow::Result;
use hn_relay_domain::CycleReport;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::interval;

use crate::args::RunArgs;
use crate::commands::{build_run_loop, log_ingested, log_published};
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        publish = config.publish.enabled,
        source = %config.source.base_url,
        "Starting hn-relay run"
    );

    let run_loop = build_run_loop(&config, dry_run, config.publish.enabled).await?;

    if args.once {
        tracing::info!("Running single cycle");
        let report = run_loop.run_cycle().await?;
        log_report(&report);
    } else {
        // Continuous polling loop
        let poll_interval = Duration::from_secs(config.source.poll_interval_secs.max(1));
        let mut ticker = interval(poll_interval);

        // Set up graceful shutdown
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        };

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A cycle can block on a slow source; the interrupt must still win
                    tokio::select! {
                        result = run_loop.run_cycle() => match result {
                            Ok(report) => log_report(&report),
                            Err(e) => tracing::error!(error = %e, "Cycle failed"),
                        },
                        _ = &mut shutdown => {
                            tracing::info!("Abandoning cycle in progress");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down gracefully");
                    break;
                }
            }
        }
    }

    tracing::info!("hn-relay run completed");
    Ok(())
}

fn log_report(report: &CycleReport) {
    log_ingested(&report.ingested);
    log_published(&report.published);
    tracing::info!(
        inserted = report.inserted_count(),
        posted = report.posted_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "Cycle complete"
    );
}
