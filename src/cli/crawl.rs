//! Crawl command - authenticate, then run the two-stage crawl

use anyhow::{Context, Result};
use console::style;
use follownet::api::{ApiError, TwitterClient};
use follownet::config::{load_crawl_config, ConfigFile};
use follownet::crawl::{CrawlReport, Crawler};
use follownet::credentials::Credentials;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

const MAX_LOGIN_ATTEMPTS: usize = 3;

/// Run the crawl command
pub fn run(
    data_dir: &Path,
    seed: &str,
    overrides: &ConfigFile,
    api_url: &str,
    json: bool,
) -> Result<()> {
    let config = load_crawl_config(data_dir, overrides);
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let client = connect(api_url)?;
    let crawler = Crawler::new(Arc::new(client), config);
    let report = crawler.run(seed).context("Crawl aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Authenticate, re-prompting for credentials when they are rejected.
fn connect(api_url: &str) -> Result<TwitterClient> {
    let mut credentials =
        Credentials::from_env_or_prompt().context("Failed to read credentials")?;
    let mut attempt = 1;
    loop {
        match TwitterClient::connect_to(api_url, &credentials) {
            Ok(client) => return Ok(client),
            Err(ApiError::Unauthorized(msg)) if attempt < MAX_LOGIN_ATTEMPTS => {
                warn!("Credentials rejected ({}), attempt {}/{}", msg, attempt, MAX_LOGIN_ATTEMPTS);
                eprintln!(
                    "{} Credentials rejected, please enter them again",
                    style("[!!]").red()
                );
                credentials = Credentials::prompt().context("Failed to read credentials")?;
                attempt += 1;
            }
            Err(e) => return Err(e).context("Failed to authenticate"),
        }
    }
}

fn print_report(report: &CrawlReport) {
    let d = &report.discovery;
    let h = &report.hydration;

    println!("\nCrawl of {}\n", style(&report.seed).cyan());
    match report.seed_id {
        Some(id) => println!("  Seed id: {}", style(id).cyan()),
        None => println!("  {} Seed could not be resolved", style("[!!]").red()),
    }
    println!(
        "  Discovery: {} frontier, {} walked, {} already cached, {} failed",
        style(d.frontier_size).cyan(),
        style(d.walked).cyan(),
        style(d.skipped_cached).dim(),
        style(d.failed_fetches).yellow()
    );
    println!(
        "  Hydration: {} batches, {} ids submitted in {} lookups, {} records, {} failed",
        style(h.batches_received).cyan(),
        style(h.submitted).cyan(),
        style(h.lookup_calls).cyan(),
        style(h.records_written).cyan(),
        style(h.failed_lookups).yellow()
    );
    if report.has_gaps() {
        println!(
            "\n  {} Some API calls failed; see the log for which accounts are missing",
            style("[!!]").yellow()
        );
    }
}
