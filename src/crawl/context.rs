//! Per-worker context: logging span, pacing, failure policy, abort flag

use super::{CrawlError, CrawlResult};
use crate::config::{FailurePolicy, PacingPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, Span};

/// Blocks the calling thread so calls stay at least `interval` apart.
#[derive(Debug, Clone)]
pub struct Pacer {
    policy: PacingPolicy,
    last_call: Option<Instant>,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        Self {
            policy,
            last_call: None,
        }
    }

    pub fn policy(&self) -> PacingPolicy {
        self.policy
    }

    /// Sleep until the next call is allowed, then mark it as made.
    ///
    /// Returns how long the thread slept.
    pub fn wait(&mut self) -> Duration {
        let now = Instant::now();
        let slept = match self.last_call {
            Some(last) if !self.policy.is_unpaced() => {
                let ready_at = last + self.policy.interval;
                let remaining = ready_at.saturating_duration_since(now);
                if !remaining.is_zero() {
                    debug!("Pacing: sleeping {:.1}s", remaining.as_secs_f64());
                    std::thread::sleep(remaining);
                }
                remaining
            }
            _ => Duration::ZERO,
        };
        self.last_call = Some(Instant::now());
        slept
    }
}

/// Everything a worker needs besides its data: handed over at construction
/// instead of living in process-wide state.
#[derive(Debug, Clone)]
pub struct CrawlContext {
    pub span: Span,
    pub pacer: Pacer,
    pub on_failure: FailurePolicy,
    /// Shared between the two workers of one crawl. Set by whichever fails.
    pub abort_flag: Option<Arc<AtomicBool>>,
}

impl CrawlContext {
    pub fn new(span: Span, pacing: PacingPolicy, on_failure: FailurePolicy) -> Self {
        Self {
            span,
            pacer: Pacer::new(pacing),
            on_failure,
            abort_flag: None,
        }
    }

    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort_flag = Some(flag);
        self
    }

    /// Tell the other worker to stop at its next check.
    pub fn abort(&self) {
        if let Some(flag) = &self.abort_flag {
            flag.store(true, Ordering::SeqCst);
        }
    }

    pub fn check_aborted(&self) -> CrawlResult<()> {
        match &self.abort_flag {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(CrawlError::Aborted),
            _ => Ok(()),
        }
    }

    /// Unpaced context with no span, for driving a worker directly.
    pub fn detached(on_failure: FailurePolicy) -> Self {
        Self::new(Span::none(), PacingPolicy::unpaced(), on_failure)
    }
}
