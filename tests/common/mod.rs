//! Shared test fixtures: an in-memory follow graph that records every call

#![allow(dead_code)]

use follownet::api::{ApiError, ApiResult, SocialGraphApi};
use follownet::{Identifier, ProfileRecord};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    Followers(Identifier),
    Friends(Identifier),
    Lookup(Vec<Identifier>),
}

/// When to break a store file
#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    /// Before the nth profile lookup (1-based)
    Lookup(usize),
    /// Before fetching this identifier's adjacency list
    Fetch(Identifier),
}

#[derive(Default)]
pub struct FakeGraph {
    handles: HashMap<String, Identifier>,
    followers: HashMap<Identifier, Vec<Identifier>>,
    friends: HashMap<Identifier, Vec<Identifier>>,
    descriptions: HashMap<Identifier, String>,
    failing_fetches: HashSet<Identifier>,
    failing_lookups: bool,
    store_breaks: Vec<(Trigger, PathBuf)>,
    calls: Mutex<Vec<Call>>,
}

pub fn ids(raw: &[u64]) -> Vec<Identifier> {
    raw.iter().copied().map(Identifier).collect()
}

impl FakeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(mut self, handle: &str, id: u64) -> Self {
        self.handles.insert(handle.to_string(), Identifier(id));
        self
    }

    pub fn followers(mut self, id: u64, of: &[u64]) -> Self {
        self.followers.insert(Identifier(id), ids(of));
        self
    }

    pub fn friends(mut self, id: u64, of: &[u64]) -> Self {
        self.friends.insert(Identifier(id), ids(of));
        self
    }

    pub fn description(mut self, id: u64, text: &str) -> Self {
        self.descriptions.insert(Identifier(id), text.to_string());
        self
    }

    pub fn failing_fetch(mut self, id: u64) -> Self {
        self.failing_fetches.insert(Identifier(id));
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    /// Replace `path` with a directory during the `nth` lookup, so the next
    /// write to that store fails.
    pub fn break_store_on_lookup(mut self, nth: usize, path: &Path) -> Self {
        self.store_breaks.push((Trigger::Lookup(nth), path.to_path_buf()));
        self
    }

    /// Replace `path` with a directory while fetching `id`'s adjacency list.
    pub fn break_store_on_fetch(mut self, id: u64, path: &Path) -> Self {
        self.store_breaks
            .push((Trigger::Fetch(Identifier(id)), path.to_path_buf()));
        self
    }

    /// The seed "alice" (1) of the reference scenario.
    pub fn alice() -> Self {
        Self::new()
            .handle("alice", 1)
            .followers(1, &[10, 20])
            .followers(10, &[20, 30])
            .followers(20, &[])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<Vec<Identifier>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Lookup(group) => Some(group),
                _ => None,
            })
            .collect()
    }

    pub fn follower_fetches(&self) -> Vec<Identifier> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Followers(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        let trigger = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call.clone());
            match call {
                Call::Lookup(_) => Some(Trigger::Lookup(
                    calls.iter().filter(|c| matches!(c, Call::Lookup(_))).count(),
                )),
                Call::Followers(id) | Call::Friends(id) => Some(Trigger::Fetch(id)),
                Call::Resolve(_) => None,
            }
        };
        for (when, path) in &self.store_breaks {
            if Some(when) == trigger.as_ref() {
                let _ = std::fs::remove_file(path);
                let _ = std::fs::create_dir_all(path);
            }
        }
    }

    fn adjacency(
        &self,
        map: &HashMap<Identifier, Vec<Identifier>>,
        id: Identifier,
        max_count: usize,
    ) -> ApiResult<Vec<Identifier>> {
        if self.failing_fetches.contains(&id) {
            return Err(ApiError::RateLimited { reset_at: None });
        }
        let mut list = map.get(&id).cloned().unwrap_or_default();
        list.truncate(max_count);
        Ok(list)
    }
}

impl SocialGraphApi for FakeGraph {
    fn resolve_handle(&self, handle: &str) -> ApiResult<Identifier> {
        self.record(Call::Resolve(handle.to_string()));
        self.handles
            .get(handle)
            .copied()
            .ok_or_else(|| ApiError::NotFound(handle.to_string()))
    }

    fn get_follower_ids(&self, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>> {
        self.record(Call::Followers(id));
        self.adjacency(&self.followers, id, max_count)
    }

    fn get_friend_ids(&self, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>> {
        self.record(Call::Friends(id));
        self.adjacency(&self.friends, id, max_count)
    }

    fn lookup_profiles(&self, group: &[Identifier]) -> ApiResult<Vec<ProfileRecord>> {
        self.record(Call::Lookup(group.to_vec()));
        if self.failing_lookups {
            return Err(ApiError::Api {
                status: 503,
                message: "over capacity".to_string(),
            });
        }
        Ok(group
            .iter()
            .map(|id| {
                let mut record = ProfileRecord::new(*id, format!("user{}", id));
                record.name = format!("User {}", id);
                record.description = self.descriptions.get(id).cloned().unwrap_or_default();
                record
            })
            .collect())
    }
}

/// Identifiers in the first column of a record store, header skipped.
pub fn first_column(path: &std::path::Path) -> Vec<Identifier> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').next())
        .map(|field| field.parse().unwrap())
        .collect()
}
