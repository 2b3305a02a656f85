//! Core data models for follownet
//!
//! These models flow between the crawler stages and the on-disk stores.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric key naming one node of the follow graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Identifier(pub u64);

impl Identifier {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Identifier)
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Identifier(id)
    }
}

/// One source's adjacency list, the unit handed from discovery to hydration.
pub type WorkBatch = Vec<Identifier>;

/// Column names of the node store, in row order.
pub const PROFILE_COLUMNS: [&str; 7] = [
    "id",
    "name",
    "screen_name",
    "description",
    "location",
    "followers_count",
    "friends_count",
];

/// Hydrated attributes of one identifier.
///
/// Field names match both the lookup API payload and the node store header,
/// so the same struct deserializes from the wire and serializes to a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileRecord {
    pub id: Identifier,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "screen_name", default, deserialize_with = "null_as_empty")]
    pub handle: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(rename = "followers_count", default)]
    pub follower_count: u64,
    #[serde(rename = "friends_count", default)]
    pub friend_count: u64,
}

impl ProfileRecord {
    pub fn new(id: impl Into<Identifier>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace newlines and commas in the description so the row stays flat.
    pub fn sanitize(&mut self) {
        self.description = sanitize_description(&self.description);
    }
}

/// Replace every `\n` and `,` with a single space.
pub fn sanitize_description(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == ',' { ' ' } else { c })
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
