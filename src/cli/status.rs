//! Status command - show what a data directory holds

use anyhow::{Context, Result};
use console::style;
use follownet::config::{load_crawl_config, ConfigFile};
use follownet::store::{count_rows, load_ids};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct Status {
    discovery_cache: usize,
    hydration_cache: usize,
    edge_rows: usize,
    node_rows: usize,
}

/// Run the status command
pub fn run(data_dir: &Path, json: bool) -> Result<()> {
    let config = load_crawl_config(data_dir, &ConfigFile::default());

    let status = Status {
        discovery_cache: load_ids(&config.discovery_cache_path())
            .context("Failed to read discovery cache")?
            .len(),
        hydration_cache: load_ids(&config.hydration_cache_path())
            .context("Failed to read hydration cache")?
            .len(),
        edge_rows: count_rows(&config.edges_path()).context("Failed to read edge store")?,
        node_rows: count_rows(&config.nodes_path()).context("Failed to read node store")?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("\nfollownet status\n");
    println!("  Data dir: {}", style(config.data_dir.display()).cyan());
    println!();
    print_line("Walked accounts", status.discovery_cache, &config.discovery_cache_path());
    print_line("Hydrated accounts", status.hydration_cache, &config.hydration_cache_path());
    print_line("Edge rows", status.edge_rows, &config.edges_path());
    print_line("Node rows", status.node_rows, &config.nodes_path());

    if status.discovery_cache == 0 && status.hydration_cache == 0 {
        println!(
            "\n  {} Nothing crawled yet. Run {}",
            style("[--]").dim(),
            style("follownet crawl <seed>").cyan()
        );
    }
    Ok(())
}

fn print_line(label: &str, count: usize, path: &Path) {
    let marker = if path.exists() {
        style("[OK]").green()
    } else {
        style("[--]").dim()
    };
    println!(
        "  {} {:<18} {:>8}  {}",
        marker,
        label,
        style(count).cyan(),
        style(path.display()).dim()
    );
}
