//! Hydration stage: resolve identifiers into profile records
//!
//! Drains the work queue until discovery drops its sender and every queued
//! batch has been handled. Stops early only when the abort flag is raised.

use super::{CrawlContext, CrawlResult};
use crate::api::{SocialGraphApi, MAX_LOOKUP_BATCH};
use crate::config::FailurePolicy;
use crate::models::{Identifier, WorkBatch};
use crate::store::{IdentityCache, NodeStore};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters from one hydration pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HydrationStats {
    pub batches_received: usize,
    /// Batches with nothing new after dedup
    pub batches_discarded: usize,
    /// Identifiers submitted for lookup
    pub submitted: usize,
    pub lookup_calls: usize,
    pub failed_lookups: usize,
    pub records_written: usize,
}

pub struct HydrationWorker {
    api: Arc<dyn SocialGraphApi>,
    cache: IdentityCache,
    nodes: NodeStore,
    ctx: CrawlContext,
    group_size: usize,
    seed: Option<Identifier>,
}

impl HydrationWorker {
    pub fn new(
        api: Arc<dyn SocialGraphApi>,
        cache: IdentityCache,
        nodes: NodeStore,
        ctx: CrawlContext,
    ) -> Self {
        Self {
            api,
            cache,
            nodes,
            ctx,
            group_size: MAX_LOOKUP_BATCH,
            seed: None,
        }
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size.clamp(1, MAX_LOOKUP_BATCH);
        self
    }

    /// Never hydrate `seed`, even when it shows up in a walked list.
    pub fn with_seed(mut self, seed: Option<Identifier>) -> Self {
        self.seed = seed;
        self
    }

    /// Consume batches until `queue` is closed and empty.
    pub fn run(mut self, queue: Receiver<WorkBatch>) -> CrawlResult<HydrationStats> {
        let span = self.ctx.span.clone();
        let _entered = span.enter();
        info!("Starting profile hydration");

        let mut stats = HydrationStats::default();
        if let Err(e) = self.drain(&queue, &mut stats) {
            self.ctx.abort();
            return Err(e);
        }

        info!(
            "Hydration finished: {} ids submitted, {} records written",
            stats.submitted, stats.records_written
        );
        Ok(stats)
    }

    fn drain(&mut self, queue: &Receiver<WorkBatch>, stats: &mut HydrationStats) -> CrawlResult<()> {
        for batch in queue.iter() {
            self.ctx.check_aborted()?;
            stats.batches_received += 1;
            self.hydrate_batch(&batch, stats)?;
        }
        Ok(())
    }

    /// Identifiers in `batch` not yet hydrated, first occurrence order kept.
    pub fn fresh_ids(&self, batch: &[Identifier]) -> Vec<Identifier> {
        let mut seen = HashSet::with_capacity(batch.len());
        batch
            .iter()
            .copied()
            .filter(|id| Some(*id) != self.seed)
            .filter(|id| !self.cache.contains(*id) && seen.insert(*id))
            .collect()
    }

    fn hydrate_batch(&mut self, batch: &[Identifier], stats: &mut HydrationStats) -> CrawlResult<()> {
        let fresh = self.fresh_ids(batch);
        info!(
            "Cache has {}, batch has {}, {} not in cache",
            self.cache.len(),
            batch.len(),
            fresh.len()
        );
        if fresh.is_empty() {
            stats.batches_discarded += 1;
            return Ok(());
        }
        stats.submitted += fresh.len();

        for group in fresh.chunks(self.group_size) {
            self.ctx.pacer.wait();
            self.ctx.check_aborted()?;
            info!("Looking up {} ids", group.len());
            stats.lookup_calls += 1;

            match self.api.lookup_profiles(group) {
                Ok(records) => {
                    stats.records_written += self.nodes.append_records(&records)?;
                    if records.len() < group.len() {
                        debug!("{} ids did not resolve", group.len() - records.len());
                    }
                }
                Err(e) => {
                    stats.failed_lookups += 1;
                    warn!(
                        transient = e.is_transient(),
                        "Lookup of {} ids failed: {}",
                        group.len(),
                        e
                    );
                    if self.ctx.on_failure == FailurePolicy::RetryNextRun {
                        continue;
                    }
                }
            }
            self.cache.insert_all(group.iter().copied())?;
        }
        Ok(())
    }
}
