//! Configuration module for follownet
//!
//! This module handles:
//! - Crawl settings (`follownet.toml` in the data directory)
//! - User-wide defaults (`~/.config/follownet/config.toml`)
//! - Pacing policies for the two API budgets

mod crawl_config;
mod pacing;

pub use crawl_config::{
    load_crawl_config, ConfigFile, CrawlConfig, FailurePolicy, PacingSection, CONFIG_FILE_NAME,
};
pub use pacing::PacingPolicy;
