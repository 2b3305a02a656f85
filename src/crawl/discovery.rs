//! Discovery stage: walk the frontier and fetch each identifier's adjacency list
//!
//! Every fetched list is sent to hydration as one [`WorkBatch`]. The send
//! blocks while the queue is full, which is what holds discovery back when
//! hydration falls behind.

use super::{CrawlContext, CrawlError, CrawlResult};
use crate::api::{Direction, SocialGraphApi};
use crate::config::FailurePolicy;
use crate::models::{Identifier, WorkBatch};
use crate::store::{EdgeStore, IdentityCache};
use crossbeam_channel::Sender;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters from one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub frontier_size: usize,
    /// Identifiers whose adjacency list was fetched (or recorded empty)
    pub walked: usize,
    pub skipped_cached: usize,
    pub failed_fetches: usize,
    pub batches_sent: usize,
}

pub struct DiscoveryWorker {
    api: Arc<dyn SocialGraphApi>,
    cache: IdentityCache,
    edges: EdgeStore,
    ctx: CrawlContext,
    direction: Direction,
    max_count: usize,
}

impl DiscoveryWorker {
    pub fn new(
        api: Arc<dyn SocialGraphApi>,
        cache: IdentityCache,
        edges: EdgeStore,
        ctx: CrawlContext,
    ) -> Self {
        Self {
            api,
            cache,
            edges,
            ctx,
            direction: Direction::Followers,
            max_count: 5000,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Walk `frontier` in order, feeding `queue`.
    ///
    /// The frontier itself goes out first so its members get hydrated too.
    /// `queue` is dropped on return, which tells hydration no more batches
    /// are coming. On failure the abort flag is raised before that happens.
    pub fn run(
        mut self,
        frontier: Vec<Identifier>,
        queue: Sender<WorkBatch>,
    ) -> CrawlResult<DiscoveryStats> {
        let span = self.ctx.span.clone();
        let _entered = span.enter();

        let result = self.walk(frontier, &queue);
        if result.is_err() {
            self.ctx.abort();
        }
        result
    }

    fn walk(
        &mut self,
        frontier: Vec<Identifier>,
        queue: &Sender<WorkBatch>,
    ) -> CrawlResult<DiscoveryStats> {
        let mut stats = DiscoveryStats {
            frontier_size: frontier.len(),
            ..Default::default()
        };
        info!("Walking {} frontier ids", frontier.len());

        if !frontier.is_empty() {
            queue.send(frontier.clone()).map_err(|_| CrawlError::QueueClosed)?;
            stats.batches_sent += 1;
        }

        let total = frontier.len();
        for (i, id) in frontier.into_iter().enumerate() {
            info!(
                "Progress: processed {} out of {} ids, {:.1}% done",
                i,
                total,
                i as f64 / total as f64 * 100.0
            );

            if self.cache.contains(id) {
                debug!("ID {} already in discovery cache", id);
                stats.skipped_cached += 1;
                continue;
            }

            let Some(adjacent) = self.fetch(id, &mut stats)? else {
                continue;
            };

            if queue.is_full() {
                debug!("Queue full, waiting for hydration");
            }
            queue
                .send(adjacent.clone())
                .map_err(|_| CrawlError::QueueClosed)?;
            stats.batches_sent += 1;

            // Row first, then cache: a cached id always has its row on disk.
            self.edges.append_edge(id, &adjacent)?;
            self.cache.insert(id)?;
            stats.walked += 1;
        }

        info!(
            "Discovery finished: {} walked, {} cached, {} failed",
            stats.walked, stats.skipped_cached, stats.failed_fetches
        );
        Ok(stats)
    }

    /// Fetch one adjacency list. `None` means leave `id` for a later run.
    fn fetch(
        &mut self,
        id: Identifier,
        stats: &mut DiscoveryStats,
    ) -> CrawlResult<Option<WorkBatch>> {
        self.ctx.pacer.wait();
        self.ctx.check_aborted()?;
        let fetched = match self.api.adjacent_ids(id, self.direction, self.max_count) {
            Ok(ids) => {
                info!("Found {} {} of {}", ids.len(), self.direction, id);
                Some(ids)
            }
            Err(e) => {
                stats.failed_fetches += 1;
                warn!(
                    transient = e.is_transient(),
                    "Fetching {} of {} failed: {}", self.direction, id, e
                );
                match self.ctx.on_failure {
                    FailurePolicy::RecordEmpty => Some(Vec::new()),
                    FailurePolicy::RetryNextRun => None,
                }
            }
        };
        Ok(fetched)
    }
}
