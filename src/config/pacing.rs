//! Request pacing policy

use std::time::Duration;

/// Minimum spacing between successive API calls of one worker.
///
/// A coarse stand-in for a token bucket: each stage issues one call at a time,
/// so spacing calls by `window / requests` keeps it inside its budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingPolicy {
    pub interval: Duration,
}

impl PacingPolicy {
    /// 15 follower-list requests per 15 minutes, plus a second of slack.
    pub const DISCOVERY: PacingPolicy = PacingPolicy {
        interval: Duration::from_secs(61),
    };

    /// 300 profile lookups per 15 minutes, plus half a second of slack.
    pub const HYDRATION: PacingPolicy = PacingPolicy {
        interval: Duration::from_millis(3500),
    };

    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// No waiting at all.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Spread `requests` evenly over `window`.
    pub fn from_budget(requests: u32, window: Duration) -> Self {
        Self::new(window / requests.max(1))
    }

    pub fn with_margin(self, margin: Duration) -> Self {
        Self::new(self.interval.saturating_add(margin))
    }

    pub fn is_unpaced(&self) -> bool {
        self.interval.is_zero()
    }
}
