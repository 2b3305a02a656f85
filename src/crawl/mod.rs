//! Two-stage crawl pipeline
//!
//! ```text
//!   seed ──► frontier ──► DiscoveryWorker ──(bounded queue)──► HydrationWorker
//!                              │                                     │
//!                    edges.csv + follow_cache           nodes.csv + user_cache
//! ```
//!
//! Each worker runs on its own thread and exclusively owns its cache, so the
//! queue and an abort flag are the only shared state. Discovery closes the
//! queue by dropping its sender; hydration drains whatever is left and then
//! stops. A worker that fails raises the abort flag so the other one stops
//! at its next API call instead of finishing its backlog.

mod context;
mod discovery;
mod hydration;

pub use context::{CrawlContext, Pacer};
pub use discovery::{DiscoveryStats, DiscoveryWorker};
pub use hydration::{HydrationStats, HydrationWorker};

use crate::api::SocialGraphApi;
use crate::config::CrawlConfig;
use crate::models::Identifier;
use crate::store::{EdgeStore, IdentityCache, NodeStore, StoreError};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

/// Fatal crawl failures. API failures never show up here.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Work queue closed before discovery finished")]
    QueueClosed,

    #[error("Stopped because the other worker failed")]
    Aborted,

    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),

    #[error("Failed to spawn {worker} worker: {source}")]
    Spawn {
        worker: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type CrawlResult<T> = Result<T, CrawlError>;

/// Outcome of one crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub seed_id: Option<Identifier>,
    /// The seed's own adjacency list could not be fetched
    pub frontier_failed: bool,
    pub discovery: DiscoveryStats,
    pub hydration: HydrationStats,
}

impl CrawlReport {
    /// Whether any API call failed, i.e. the stores may have gaps.
    pub fn has_gaps(&self) -> bool {
        self.seed_id.is_none()
            || self.frontier_failed
            || self.discovery.failed_fetches > 0
            || self.hydration.failed_lookups > 0
    }
}

/// Crawl orchestrator
pub struct Crawler {
    api: Arc<dyn SocialGraphApi>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(api: Arc<dyn SocialGraphApi>, config: CrawlConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl one hop out from `seed` (a handle), resuming from the caches.
    ///
    /// Blocks until both workers are done. A store failure in either worker
    /// aborts the run and is returned.
    pub fn run(&self, seed: &str) -> CrawlResult<CrawlReport> {
        let config = &self.config;
        let crawl_span = info_span!("crawl", seed = %seed);
        let _entered = crawl_span.enter();

        info!("Loading caches");
        let discovery_cache = IdentityCache::load("discovery", config.discovery_cache_path())?;
        let hydration_cache = IdentityCache::load("hydration", config.hydration_cache_path())?;
        let edges = EdgeStore::initialize(config.edges_path(), config.direction.column_label())?;
        let nodes = NodeStore::initialize(config.nodes_path())?;

        let abort_flag = Arc::new(AtomicBool::new(false));
        let mut discovery_ctx = CrawlContext::new(
            info_span!("discovery"),
            config.discovery,
            config.on_fetch_failure,
        )
        .with_abort_flag(Arc::clone(&abort_flag));
        let hydration_ctx = CrawlContext::new(
            info_span!("hydration"),
            config.hydration,
            config.on_fetch_failure,
        )
        .with_abort_flag(abort_flag);

        // The frontier is never cached, so a rerun always re-derives it.
        info!("Scraping network, pivot from {}", seed);
        let (seed_id, frontier) = self.frontier(seed, &mut discovery_ctx.pacer);
        let frontier_failed = frontier.is_none();
        let frontier = frontier.unwrap_or_default();

        let discovery = DiscoveryWorker::new(
            Arc::clone(&self.api),
            discovery_cache,
            edges,
            discovery_ctx,
        )
        .with_direction(config.direction)
        .with_max_count(config.max_followers);
        let hydration = HydrationWorker::new(
            Arc::clone(&self.api),
            hydration_cache,
            nodes,
            hydration_ctx,
        )
        .with_group_size(config.lookup_group_size)
        .with_seed(seed_id);

        let (tx, rx) = bounded(config.queue_capacity);

        let discovery_handle = thread::Builder::new()
            .name("discovery".to_string())
            .spawn(move || discovery.run(frontier, tx))
            .map_err(|source| CrawlError::Spawn {
                worker: "discovery",
                source,
            })?;

        let hydration_handle = match thread::Builder::new()
            .name("hydration".to_string())
            .spawn(move || hydration.run(rx))
        {
            Ok(handle) => handle,
            Err(source) => {
                // The receiver went down with the closure; discovery will
                // stop at its next send.
                let _ = discovery_handle.join();
                return Err(CrawlError::Spawn {
                    worker: "hydration",
                    source,
                });
            }
        };

        let discovery_result = discovery_handle
            .join()
            .unwrap_or_else(|_| Err(CrawlError::WorkerPanicked("discovery")));
        let hydration_result = hydration_handle
            .join()
            .unwrap_or_else(|_| Err(CrawlError::WorkerPanicked("hydration")));

        let (discovery, hydration) = match (discovery_result, hydration_result) {
            (Ok(d), Ok(h)) => (d, h),
            // Hydration died first; discovery only saw the fallout.
            (Err(CrawlError::QueueClosed | CrawlError::Aborted), Err(e)) | (Ok(_), Err(e)) => {
                error!("Hydration aborted: {}", e);
                return Err(e);
            }
            (Err(e), _) => {
                error!("Discovery aborted: {}", e);
                return Err(e);
            }
        };

        let report = CrawlReport {
            seed: seed.to_string(),
            seed_id,
            frontier_failed,
            discovery,
            hydration,
        };
        if report.has_gaps() {
            warn!("Some API calls failed; stores may be incomplete for this run");
        }
        info!("All finished");
        Ok(report)
    }

    /// Resolve the seed and fetch its adjacency list.
    ///
    /// Failures are logged and leave the frontier empty (`None`).
    fn frontier(
        &self,
        seed: &str,
        pacer: &mut Pacer,
    ) -> (Option<Identifier>, Option<Vec<Identifier>>) {
        let seed_id = match self.api.resolve_handle(seed) {
            Ok(id) => id,
            Err(e) => {
                error!("Could not resolve seed {}: {}", seed, e);
                return (None, None);
            }
        };

        pacer.wait();
        match self
            .api
            .adjacent_ids(seed_id, self.config.direction, self.config.max_followers)
        {
            Ok(ids) => {
                info!("Found {} {} from {}", ids.len(), self.config.direction, seed);
                (Some(seed_id), Some(ids))
            }
            Err(e) => {
                error!("When getting {} for {}: {}", self.config.direction, seed, e);
                (Some(seed_id), None)
            }
        }
    }
}
