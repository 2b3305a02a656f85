//! End-to-end crawl tests against an in-memory follow graph
//!
//! Each test crawls into its own temp directory with pacing disabled.

mod common;

use common::{first_column, ids, Call, FakeGraph};
use follownet::config::FailurePolicy;
use follownet::store::{load_ids, StoreError};
use follownet::{CrawlConfig, CrawlError, Crawler, Direction, Identifier, PacingPolicy};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn crawl(graph: &Arc<FakeGraph>, config: CrawlConfig) -> follownet::CrawlReport {
    Crawler::new(graph.clone(), config).run("alice").unwrap()
}

fn set(raw: &[u64]) -> HashSet<Identifier> {
    ids(raw).into_iter().collect()
}

/// Seed "alice" (1) with `width` followers from 100 up, each with two
/// followers of its own.
fn wide_graph(width: u64) -> FakeGraph {
    let frontier: Vec<u64> = (100..100 + width).collect();
    let mut graph = FakeGraph::new().handle("alice", 1).followers(1, &frontier);
    for id in &frontier {
        graph = graph.followers(*id, &[id + 1000, id + 2000]);
    }
    graph
}

fn assert_store_io_error(err: CrawlError, expected: &Path) {
    match err {
        CrawlError::Store(StoreError::Io { path, .. }) => assert_eq!(path, expected),
        other => panic!("expected I/O error on {}, got {:?}", expected.display(), other),
    }
}

#[test]
fn test_end_to_end_one_hop() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    let graph = Arc::new(FakeGraph::alice());

    let report = crawl(&graph, config.clone());

    let edges = std::fs::read_to_string(config.edges_path()).unwrap();
    assert_eq!(edges, "source_id,follower_ids\n10,20,30\n20\n");

    let nodes: HashSet<_> = first_column(&config.nodes_path()).into_iter().collect();
    assert_eq!(nodes, set(&[10, 20, 30]));

    assert_eq!(load_ids(&config.discovery_cache_path()).unwrap(), set(&[10, 20]));
    assert_eq!(load_ids(&config.hydration_cache_path()).unwrap(), set(&[10, 20, 30]));

    assert_eq!(report.seed_id, Some(Identifier(1)));
    assert_eq!(report.discovery.frontier_size, 2);
    assert_eq!(report.discovery.walked, 2);
    assert_eq!(report.hydration.records_written, 3);
    assert!(!report.has_gaps());
}

#[test]
fn test_rerun_makes_no_redundant_calls() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();

    crawl(&Arc::new(FakeGraph::alice()), config.clone());

    let graph = Arc::new(FakeGraph::alice());
    let report = crawl(&graph, config.clone());

    // Only the frontier is derived again; nothing is walked or hydrated twice.
    assert_eq!(
        graph.calls(),
        vec![Call::Resolve("alice".to_string()), Call::Followers(Identifier(1))]
    );
    assert_eq!(report.discovery.skipped_cached, 2);
    assert_eq!(report.hydration.submitted, 0);

    // Headers were not duplicated and no rows were added.
    let edges = std::fs::read_to_string(config.edges_path()).unwrap();
    assert_eq!(edges.matches("source_id").count(), 1);
    assert_eq!(first_column(&config.nodes_path()).len(), 3);
}

#[test]
fn test_rerun_picks_up_new_frontier_members() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();

    crawl(&Arc::new(FakeGraph::alice()), config.clone());

    let graph = Arc::new(
        FakeGraph::alice()
            .followers(1, &[10, 20, 40])
            .followers(40, &[10, 50]),
    );
    crawl(&graph, config.clone());

    assert_eq!(
        graph.follower_fetches(),
        vec![Identifier(1), Identifier(40)]
    );
    assert_eq!(graph.lookups(), vec![ids(&[40]), ids(&[50])]);
}

#[test]
fn test_descriptions_sanitized_in_node_store() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    let graph = Arc::new(FakeGraph::alice().description(30, "hello,\nworld"));

    crawl(&graph, config.clone());

    let nodes = std::fs::read_to_string(config.nodes_path()).unwrap();
    let row = nodes.lines().find(|l| l.starts_with("30,")).unwrap();
    assert!(row.contains(",hello  world,"), "row was {:?}", row);
}

#[test]
fn test_failed_fetch_recorded_empty_by_default() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    let graph = Arc::new(FakeGraph::alice().failing_fetch(10));

    let report = crawl(&graph, config.clone());

    assert_eq!(report.discovery.failed_fetches, 1);
    assert!(report.has_gaps());
    assert_eq!(load_ids(&config.discovery_cache_path()).unwrap(), set(&[10, 20]));
    let edges = std::fs::read_to_string(config.edges_path()).unwrap();
    assert_eq!(edges, "source_id,follower_ids\n10\n20\n");

    // Marked done: never retried.
    let graph = Arc::new(FakeGraph::alice());
    crawl(&graph, config);
    assert_eq!(graph.follower_fetches(), vec![Identifier(1)]);
}

#[test]
fn test_failed_fetch_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let mut config = CrawlConfig::in_dir(dir.path()).unpaced();
    config.on_fetch_failure = FailurePolicy::RetryNextRun;

    let graph = Arc::new(FakeGraph::alice().failing_fetch(10));
    crawl(&graph, config.clone());

    assert_eq!(load_ids(&config.discovery_cache_path()).unwrap(), set(&[20]));
    let edges = std::fs::read_to_string(config.edges_path()).unwrap();
    assert_eq!(edges, "source_id,follower_ids\n20\n");

    let graph = Arc::new(FakeGraph::alice());
    crawl(&graph, config.clone());
    assert_eq!(graph.follower_fetches(), vec![Identifier(1), Identifier(10)]);
    assert_eq!(load_ids(&config.hydration_cache_path()).unwrap(), set(&[10, 20, 30]));
}

#[test]
fn test_failed_lookups_policies() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    let report = crawl(&Arc::new(FakeGraph::alice().failing_lookups()), config.clone());

    assert_eq!(report.hydration.failed_lookups, 2);
    assert_eq!(report.hydration.records_written, 0);
    assert_eq!(load_ids(&config.hydration_cache_path()).unwrap(), set(&[10, 20, 30]));

    let dir = TempDir::new().unwrap();
    let mut config = CrawlConfig::in_dir(dir.path()).unpaced();
    config.on_fetch_failure = FailurePolicy::RetryNextRun;
    crawl(&Arc::new(FakeGraph::alice().failing_lookups()), config.clone());

    assert!(load_ids(&config.hydration_cache_path()).unwrap().is_empty());
}

#[test]
fn test_unknown_seed_yields_empty_crawl() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    let graph = Arc::new(FakeGraph::new());

    let report = Crawler::new(graph.clone(), config.clone()).run("nobody").unwrap();

    assert_eq!(report.seed_id, None);
    assert!(report.has_gaps());
    assert_eq!(graph.calls(), vec![Call::Resolve("nobody".to_string())]);
    assert_eq!(
        std::fs::read_to_string(config.edges_path()).unwrap(),
        "source_id,follower_ids\n"
    );
}

#[test]
fn test_friends_direction() {
    let dir = TempDir::new().unwrap();
    let mut config = CrawlConfig::in_dir(dir.path()).unpaced();
    config.direction = Direction::Friends;

    let graph = Arc::new(
        FakeGraph::new()
            .handle("alice", 1)
            .friends(1, &[5])
            .friends(5, &[6, 7]),
    );
    crawl(&graph, config.clone());

    assert!(graph.follower_fetches().is_empty());
    let edges = std::fs::read_to_string(config.edges_path()).unwrap();
    assert_eq!(edges, "source_id,friend_ids\n5,6,7\n");
}

#[test]
fn test_tiny_queue_still_completes() {
    let dir = TempDir::new().unwrap();
    let mut config = CrawlConfig::in_dir(dir.path()).unpaced();
    config.queue_capacity = 1;

    let report = crawl(&Arc::new(wide_graph(40)), config.clone());

    assert_eq!(report.discovery.walked, 40);
    assert_eq!(report.hydration.batches_received, 41);
    assert_eq!(load_ids(&config.hydration_cache_path()).unwrap().len(), 40 * 3);
}

#[test]
fn test_store_failure_aborts_run() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    // A directory where the node store file should be
    std::fs::create_dir(config.nodes_path()).unwrap();

    let err = Crawler::new(Arc::new(FakeGraph::alice()), config)
        .run("alice")
        .unwrap_err();

    assert!(matches!(err, CrawlError::Store(_)), "got {:?}", err);
}

#[test]
fn test_node_store_failure_mid_run_aborts() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    let graph = Arc::new(wide_graph(20).break_store_on_lookup(2, &config.nodes_path()));

    let err = Crawler::new(graph, config.clone()).run("alice").unwrap_err();

    // Discovery only sees the closed queue; the node store error is reported.
    assert_store_io_error(err, &config.nodes_path());
}

#[test]
fn test_edge_store_failure_stops_hydration_early() {
    let dir = TempDir::new().unwrap();
    let mut config = CrawlConfig::in_dir(dir.path()).unpaced();
    config.hydration = PacingPolicy::new(Duration::from_millis(200));
    let graph = Arc::new(wide_graph(20).break_store_on_fetch(114, &config.edges_path()));

    let started = Instant::now();
    let err = Crawler::new(graph.clone(), config.clone())
        .run("alice")
        .unwrap_err();

    assert_store_io_error(err, &config.edges_path());
    // 16 batches were queued; hydration gave up instead of working through them.
    assert!(graph.lookups().len() <= 2, "lookups: {:?}", graph.lookups());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_seed_never_hydrated() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::in_dir(dir.path()).unpaced();
    // 10 is followed back by the seed.
    let graph = Arc::new(FakeGraph::alice().followers(10, &[1, 30]));

    crawl(&graph, config.clone());

    assert_eq!(graph.lookups(), vec![ids(&[10, 20]), ids(&[30])]);
    let nodes: HashSet<_> = first_column(&config.nodes_path()).into_iter().collect();
    assert_eq!(nodes, set(&[10, 20, 30]));
}
