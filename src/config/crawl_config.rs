//! Crawl configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. user config (`~/.config/follownet/config.toml`)
//! 3. `follownet.toml` in the data directory
//! 4. command-line flags
//!
//! ```toml
//! # follownet.toml
//! queue_capacity = 50
//! max_followers = 5000
//! lookup_group_size = 100
//! direction = "followers"          # or "friends"
//! on_fetch_failure = "record-empty" # or "retry-next-run"
//!
//! [discovery]
//! interval_secs = 61
//!
//! [hydration]
//! requests = 300      # budget form: requests per window
//! window_secs = 900
//! margin_secs = 0.5
//! ```

use super::PacingPolicy;
use crate::api::{Direction, MAX_LOOKUP_BATCH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "follownet.toml";

/// What to do when an API call for an identifier fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the call as an empty result and mark the identifier done.
    /// Failed identifiers are never retried.
    #[default]
    RecordEmpty,
    /// Leave the identifier out of the caches and stores so the next run
    /// tries it again.
    RetryNextRun,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "record-empty" => Ok(FailurePolicy::RecordEmpty),
            "retry-next-run" => Ok(FailurePolicy::RetryNextRun),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Fully resolved crawl settings
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    pub data_dir: PathBuf,
    pub nodes_file: String,
    pub edges_file: String,
    pub hydration_cache_file: String,
    pub discovery_cache_file: String,
    /// Batches in flight between discovery and hydration
    pub queue_capacity: usize,
    /// Cap on adjacency ids fetched per identifier
    pub max_followers: usize,
    /// Identifiers per profile lookup
    pub lookup_group_size: usize,
    pub direction: Direction,
    pub on_fetch_failure: FailurePolicy,
    pub discovery: PacingPolicy,
    pub hydration: PacingPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            nodes_file: "nodes.csv".to_string(),
            edges_file: "edges.csv".to_string(),
            hydration_cache_file: "user_cache.txt".to_string(),
            discovery_cache_file: "follow_cache.txt".to_string(),
            queue_capacity: 50,
            max_followers: 5000,
            lookup_group_size: MAX_LOOKUP_BATCH,
            direction: Direction::default(),
            on_fetch_failure: FailurePolicy::default(),
            discovery: PacingPolicy::DISCOVERY,
            hydration: PacingPolicy::HYDRATION,
        }
    }
}

impl CrawlConfig {
    /// Defaults rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Same settings with both stages unpaced.
    pub fn unpaced(mut self) -> Self {
        self.discovery = PacingPolicy::unpaced();
        self.hydration = PacingPolicy::unpaced();
        self
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.data_dir.join(&self.nodes_file)
    }

    pub fn edges_path(&self) -> PathBuf {
        self.data_dir.join(&self.edges_file)
    }

    pub fn hydration_cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.hydration_cache_file)
    }

    pub fn discovery_cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.discovery_cache_file)
    }

    /// Overlay every value set in `file`.
    pub fn apply(&mut self, file: &ConfigFile) {
        if let Some(dir) = &file.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(v) = &file.nodes_file {
            self.nodes_file = v.clone();
        }
        if let Some(v) = &file.edges_file {
            self.edges_file = v.clone();
        }
        if let Some(v) = &file.hydration_cache_file {
            self.hydration_cache_file = v.clone();
        }
        if let Some(v) = &file.discovery_cache_file {
            self.discovery_cache_file = v.clone();
        }
        if let Some(v) = file.queue_capacity {
            self.queue_capacity = v;
        }
        if let Some(v) = file.max_followers {
            self.max_followers = v;
        }
        if let Some(v) = file.lookup_group_size {
            self.lookup_group_size = v;
        }
        if let Some(v) = file.direction {
            self.direction = v;
        }
        if let Some(v) = file.on_fetch_failure {
            self.on_fetch_failure = v;
        }
        if let Some(policy) = file.discovery.as_ref().and_then(PacingSection::policy) {
            self.discovery = policy;
        }
        if let Some(policy) = file.hydration.as_ref().and_then(PacingSection::policy) {
            self.hydration = policy;
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        if self.lookup_group_size == 0 || self.lookup_group_size > MAX_LOOKUP_BATCH {
            warn!(
                "lookup_group_size {} out of range, using {}",
                self.lookup_group_size, MAX_LOOKUP_BATCH
            );
            self.lookup_group_size = MAX_LOOKUP_BATCH;
        }
        self.queue_capacity = self.queue_capacity.max(1);
    }
}

/// Pacing as written in a config file: an explicit interval, or a budget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacingSection {
    pub interval_secs: Option<f64>,
    pub requests: Option<u32>,
    pub window_secs: Option<f64>,
    pub margin_secs: Option<f64>,
}

impl PacingSection {
    pub fn policy(&self) -> Option<PacingPolicy> {
        let secs = |v: f64| Duration::try_from_secs_f64(v).ok();

        if let Some(interval) = self.interval_secs.and_then(secs) {
            return Some(PacingPolicy::new(interval));
        }
        let (requests, window) = (self.requests?, self.window_secs.and_then(secs)?);
        let margin = self.margin_secs.and_then(secs).unwrap_or(Duration::ZERO);
        Some(PacingPolicy::from_budget(requests, window).with_margin(margin))
    }

    pub fn interval(secs: f64) -> Self {
        Self {
            interval_secs: Some(secs),
            ..Default::default()
        }
    }
}

/// One configuration layer; unset keys leave lower layers alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub nodes_file: Option<String>,
    pub edges_file: Option<String>,
    pub hydration_cache_file: Option<String>,
    pub discovery_cache_file: Option<String>,
    pub queue_capacity: Option<usize>,
    pub max_followers: Option<usize>,
    pub lookup_group_size: Option<usize>,
    pub direction: Option<Direction>,
    pub on_fetch_failure: Option<FailurePolicy>,
    pub discovery: Option<PacingSection>,
    pub hydration: Option<PacingSection>,
}

impl ConfigFile {
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("follownet").join("config.toml"))
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Read a layer if the file exists; a broken file is logged and skipped.
    fn read_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::read(path) {
            Ok(layer) => {
                debug!("Loaded config from {}", path.display());
                Some(layer)
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Resolve the effective config for a crawl rooted at `data_dir`.
///
/// `overrides` carries command-line flags and is applied last.
pub fn load_crawl_config(data_dir: &Path, overrides: &ConfigFile) -> CrawlConfig {
    let mut config = CrawlConfig::in_dir(data_dir);

    if let Some(user) = ConfigFile::user_config_path().and_then(|p| ConfigFile::read_optional(&p)) {
        config.apply(&user);
    }
    if let Some(project) = ConfigFile::read_optional(&data_dir.join(CONFIG_FILE_NAME)) {
        config.apply(&project);
    }
    config.apply(overrides);
    config
}
