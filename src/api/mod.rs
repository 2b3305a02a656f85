//! Social-graph API access
//!
//! The crawler only talks to the [`SocialGraphApi`] trait. [`TwitterClient`]
//! is the HTTP implementation; tests swap in an in-memory fake.
//!
//! Implementations must not sleep on rate limits. Pacing belongs to the
//! crawler, which knows the request budget of each stage.

mod twitter;

pub use twitter::{TwitterClient, DEFAULT_BASE_URL};

use crate::models::{Identifier, ProfileRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most identifiers a single profile lookup accepts.
pub const MAX_LOOKUP_BATCH: usize = 100;

/// Errors returned by a social-graph API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Rate limited (window resets at {reset_at:?})")]
    RateLimited { reset_at: Option<u64> },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("No such handle: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } | ApiError::Transport(_) => true,
            ApiError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Which adjacency list of a node to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Accounts following the node
    #[default]
    Followers,
    /// Accounts the node follows
    Friends,
}

impl Direction {
    /// Column label used for the adjacency list in the edge store header.
    pub fn column_label(&self) -> &'static str {
        match self {
            Direction::Followers => "follower_ids",
            Direction::Friends => "friend_ids",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Followers => write!(f, "followers"),
            Direction::Friends => write!(f, "friends"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "followers" => Ok(Direction::Followers),
            "friends" => Ok(Direction::Friends),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Calls the crawler makes against the social graph
pub trait SocialGraphApi: Send + Sync {
    /// Resolve a handle (screen name) to its identifier.
    fn resolve_handle(&self, handle: &str) -> ApiResult<Identifier>;

    /// Identifiers following `id`, in API order, at most `max_count`.
    fn get_follower_ids(&self, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>>;

    /// Identifiers `id` follows, in API order, at most `max_count`.
    fn get_friend_ids(&self, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>>;

    /// Profiles for up to [`MAX_LOOKUP_BATCH`] identifiers. Unknown or
    /// suspended identifiers are silently absent from the result.
    fn lookup_profiles(&self, ids: &[Identifier]) -> ApiResult<Vec<ProfileRecord>>;

    /// Dispatch to the adjacency call matching `direction`.
    fn adjacent_ids(
        &self,
        id: Identifier,
        direction: Direction,
        max_count: usize,
    ) -> ApiResult<Vec<Identifier>> {
        match direction {
            Direction::Followers => self.get_follower_ids(id, max_count),
            Direction::Friends => self.get_friend_ids(id, max_count),
        }
    }
}
