//! Init command - write an example follownet.toml

use anyhow::{Context, Result};
use console::style;
use follownet::config::CONFIG_FILE_NAME;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# follownet configuration
# Command-line flags override anything set here.

# Bounded queue between discovery and hydration (batches in flight)
queue_capacity = 50

# Adjacency ids fetched per account
max_followers = 5000

# Accounts per profile lookup (1-100)
lookup_group_size = 100

# "followers" walks who follows each account, "friends" who they follow
direction = "followers"

# "record-empty": a failed call counts as an empty result and is not retried
# "retry-next-run": failed accounts stay uncached and are retried next run
on_fetch_failure = "record-empty"

# File names, relative to the data directory
# nodes_file = "nodes.csv"
# edges_file = "edges.csv"
# discovery_cache_file = "follow_cache.txt"
# hydration_cache_file = "user_cache.txt"

[discovery]
# 15 requests per 15 minutes
interval_secs = 61

[hydration]
# 300 requests per 15 minutes; a budget works too
# requests = 300
# window_secs = 900
# margin_secs = 0.5
interval_secs = 3.5
"#;

/// Run the init command
pub fn run(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!("\nNext steps:");
    println!("  {} Start crawling", style("follownet crawl <seed>").cyan());
    println!("  {} Check progress", style("follownet status").cyan());
    Ok(())
}
