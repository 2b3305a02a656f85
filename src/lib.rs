//! follownet - resumable crawler for social follow graphs
//!
//! Starting from one seed account, follownet fetches the followers of each
//! of the seed's followers (discovery) and resolves every account it meets
//! into a profile record (hydration). Both stages run concurrently, joined by
//! a bounded queue, and both keep an append-only cache on disk so a restarted
//! crawl skips finished work.
//!
//! # Example
//!
//! ```rust,ignore
//! use follownet::{Crawler, CrawlConfig, Credentials, TwitterClient};
//! use std::sync::Arc;
//!
//! let client = TwitterClient::connect(&Credentials::from_env_or_prompt()?)?;
//! let report = Crawler::new(Arc::new(client), CrawlConfig::in_dir("data")).run("alice")?;
//! println!("hydrated {} accounts", report.hydration.records_written);
//! ```

pub mod api;
pub mod config;
pub mod crawl;
pub mod credentials;
pub mod models;
pub mod store;

pub use api::{ApiError, Direction, SocialGraphApi, TwitterClient};
pub use config::{CrawlConfig, FailurePolicy, PacingPolicy};
pub use crawl::{CrawlError, CrawlReport, Crawler};
pub use credentials::Credentials;
pub use models::{Identifier, ProfileRecord, WorkBatch};
