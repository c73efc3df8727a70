//! Doctor command - validate configuration and show status

use anyhow::Result;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::commands::{DatabaseKind, build_repository, load_secret};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    source: CheckResult,
    mastodon: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        database: CheckResult::error("Not checked"),
        source: CheckResult::error("Not checked"),
        mastodon: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.database = check_database(config).await;
        report.source = check_source(config);
        report.mastodon = check_mastodon(config);
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.database,
        &report.source,
        &report.mastodon,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_database(config: &AppConfig) -> CheckResult {
    let url = match load_secret(&config.database.url_env, "database") {
        Ok(url) => url,
        Err(e) => return CheckResult::error(e.to_string()),
    };

    let kind = match DatabaseKind::from_url(url.expose_secret()) {
        Ok(kind) => kind,
        Err(e) => return CheckResult::error(e.to_string()),
    };

    match build_repository(config).await {
        Ok(_) => CheckResult::ok(format!(
            "{:?} store reachable via {}",
            kind, config.database.url_env
        ))
        .with_details(serde_json::json!({
            "backend": format!("{:?}", kind).to_lowercase(),
            "retain_count": config.database.retain_count,
        })),
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn check_source(config: &AppConfig) -> CheckResult {
    let base_url = config.source.base_url.trim();

    if base_url.is_empty() {
        return CheckResult::error("Source base_url is empty");
    }

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return CheckResult::error(format!("Source base_url is not an HTTP URL: {}", base_url));
    }

    CheckResult::ok(format!(
        "Source: {}, poll every {}s",
        base_url, config.source.poll_interval_secs
    ))
}

fn check_mastodon(config: &AppConfig) -> CheckResult {
    if !config.publish.enabled {
        return CheckResult::ok("Publishing disabled");
    }

    let mastodon = &config.mastodon;
    let missing: Vec<&str> = [
        mastodon.client_id_env.as_str(),
        mastodon.client_secret_env.as_str(),
        mastodon.username_env.as_str(),
        mastodon.password_env.as_str(),
    ]
    .into_iter()
    .filter(|env_var| !matches!(std::env::var(env_var), Ok(val) if !val.is_empty()))
    .collect();

    if missing.is_empty() {
        CheckResult::ok(format!("Instance: {}, credentials set", mastodon.instance))
    } else {
        CheckResult::warn(format!(
            "Instance: {}, credentials not set: {}",
            mastodon.instance,
            missing.join(", ")
        ))
    }
}

fn print_report(report: &DoctorReport) {
    println!("hn-relay Doctor Report");
    println!("======================");
    println!();

    print_check("Config", &report.config);
    print_check("Database", &report.database);
    print_check("Source", &report.source);
    print_check("Mastodon", &report.mastodon);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: hn-relay run --dry-run --once");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
