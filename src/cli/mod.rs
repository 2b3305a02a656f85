//! CLI command definitions and handlers

mod crawl;
mod init;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};
use follownet::config::{ConfigFile, FailurePolicy, PacingSection};
use follownet::Direction;
use std::path::PathBuf;

/// Parse and validate queue capacity (1-10000)
fn parse_capacity(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("queue capacity must be at least 1".to_string())
    } else if n > 10_000 {
        Err("queue capacity cannot exceed 10000".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a non-negative number of seconds
fn parse_seconds(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err("interval must be a non-negative number of seconds".to_string())
    }
}

/// follownet - resumable social follow-graph crawler
#[derive(Parser, Debug)]
#[command(name = "follownet")]
#[command(
    version,
    about = "Crawl one hop of a social follow graph into flat CSV files, politely and resumably",
    long_about = "follownet starts from a seed account, walks the followers of each of \
its followers, and hydrates every account it meets into a profile row.\n\n\
Progress is cached on disk, so an interrupted crawl picks up where it stopped. \
Requests are paced to stay inside the API's rate limits.",
    after_help = "\
Examples:
  follownet crawl alice                       Crawl into the current directory
  follownet --data-dir data crawl alice       Crawl into ./data
  follownet crawl alice --direction friends   Walk who they follow instead
  follownet status                            Show cache and store sizes
  follownet init                              Write a commented follownet.toml"
)]
pub struct Cli {
    /// Directory holding caches, stores and follownet.toml
    #[arg(long, global = true, default_value = ".")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the graph around a seed handle
    #[command(after_help = "\
Credentials come from API_KEY, API_SECRET, ACCESS_KEY and ACCESS_SECRET;
anything missing is prompted for.

Examples:
  follownet crawl alice
  follownet crawl alice --on-fetch-failure retry-next-run
  follownet crawl alice --discovery-interval 0 --hydration-interval 0   (no pacing)")]
    Crawl {
        /// Seed handle (screen name), with or without '@'
        seed: String,

        /// Bounded queue capacity between discovery and hydration
        #[arg(long, value_parser = parse_capacity)]
        queue_capacity: Option<usize>,

        /// Maximum adjacency ids fetched per account
        #[arg(long)]
        max_followers: Option<usize>,

        /// Which adjacency to walk
        #[arg(long, value_parser = ["followers", "friends"])]
        direction: Option<String>,

        /// Seconds between adjacency fetches (default 61)
        #[arg(long, value_parser = parse_seconds)]
        discovery_interval: Option<f64>,

        /// Seconds between profile lookups (default 3.5)
        #[arg(long, value_parser = parse_seconds)]
        hydration_interval: Option<f64>,

        /// What to do with an account whose API call failed
        #[arg(long, value_parser = ["record-empty", "retry-next-run"])]
        on_fetch_failure: Option<String>,

        /// API base URL
        #[arg(long, env = "FOLLOWNET_API_URL", default_value = follownet::api::DEFAULT_BASE_URL)]
        api_url: String,

        /// Print the crawl report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what the caches and stores hold
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a commented follownet.toml into the data directory
    Init,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => init::run(&cli.data_dir),

        Commands::Status { json } => status::run(&cli.data_dir, json),

        Commands::Crawl {
            seed,
            queue_capacity,
            max_followers,
            direction,
            discovery_interval,
            hydration_interval,
            on_fetch_failure,
            api_url,
            json,
        } => {
            // value_parser already restricted these to known values
            let direction = direction
                .map(|d| d.parse::<Direction>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let on_fetch_failure = on_fetch_failure
                .map(|p| p.parse::<FailurePolicy>())
                .transpose()
                .map_err(anyhow::Error::msg)?;

            let overrides = ConfigFile {
                queue_capacity,
                max_followers,
                direction,
                on_fetch_failure,
                discovery: discovery_interval.map(PacingSection::interval),
                hydration: hydration_interval.map(PacingSection::interval),
                ..Default::default()
            };
            crawl::run(&cli.data_dir, &seed, &overrides, &api_url, json)
        }
    }
}
