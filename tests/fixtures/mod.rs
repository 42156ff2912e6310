//! Test fixtures and builders for integration testing

use pool_hall::amqp::publisher::InMemoryProposalQueue;
use pool_hall::config::IgnoreListSettings;
use pool_hall::ignore::store::InMemoryIgnoreListStore;
use pool_hall::pool::engine::{EngineSettings, PoolFilterEngine};
use pool_hall::proposal::pipeline::{PipelineSettings, ProposalPipeline};
use pool_hall::service::OrchestrationService;
use pool_hall::store::players::{InMemoryPlayerRepository, PlayerRepository};
use pool_hall::types::{
    AttributeFilter, AttributeValue, MatchObject, Player, PlayerPool, Profile, Roster,
};
use std::sync::Arc;

/// A complete in-memory orchestration stack with handles to every component
pub struct TestStack {
    pub service: Arc<OrchestrationService>,
    pub players: Arc<InMemoryPlayerRepository>,
    pub profiles: Arc<pool_hall::store::profiles::InMemoryProfileStore>,
    pub proposals: Arc<pool_hall::store::proposals::InMemoryProposalStore>,
    pub ignore: Arc<InMemoryIgnoreListStore>,
    pub queue: Arc<InMemoryProposalQueue>,
}

/// Build a complete test system with the given chunk size
pub fn build_stack_with_chunk_size(chunk_size: usize) -> TestStack {
    let profiles = Arc::new(pool_hall::store::profiles::InMemoryProfileStore::new());
    let players = Arc::new(InMemoryPlayerRepository::new());
    let ignore = Arc::new(InMemoryIgnoreListStore::new());
    let proposals = Arc::new(pool_hall::store::proposals::InMemoryProposalStore::new());
    let queue = Arc::new(InMemoryProposalQueue::new());
    let windows = IgnoreListSettings::default();

    let engine = PoolFilterEngine::new(
        players.clone(),
        ignore.clone(),
        windows.clone(),
        EngineSettings {
            chunk_size,
            channel_capacity: 4,
        },
    );
    let pipeline = ProposalPipeline::new(
        ignore.clone(),
        proposals.clone(),
        queue.clone(),
        PipelineSettings {
            max_persist_retries: 2,
            retry_delay_ms: 1,
        },
    );
    let service = Arc::new(OrchestrationService::new(
        profiles.clone(),
        engine,
        pipeline,
        ignore.clone(),
        windows,
    ));

    TestStack {
        service,
        players,
        profiles,
        proposals,
        ignore,
        queue,
    }
}

/// Build a complete test system with default settings
pub fn build_stack() -> TestStack {
    build_stack_with_chunk_size(10)
}

/// A player with numeric attributes
pub fn player(id: &str, attributes: &[(&str, i64)]) -> Player {
    let mut p = Player::with_id(id);
    for (name, value) in attributes {
        p.attributes
            .insert(name.to_string(), AttributeValue::Number(*value));
    }
    p
}

/// Seed `count` players all carrying the given level
pub fn seed_levelled_players(players: &InMemoryPlayerRepository, count: usize, level: i64) {
    for i in 0..count {
        players
            .upsert_player(player(&format!("p{:04}", i), &[("level", level)]))
            .expect("seed player");
    }
}

/// A profile with the given pools and an empty properties document
pub fn profile(id: &str, pools: Vec<PlayerPool>) -> Profile {
    Profile {
        id: id.to_string(),
        properties: "{}".to_string(),
        pools,
    }
}

/// A pool with a single inclusive level range filter
pub fn level_pool(name: &str, min: i64, max: i64) -> PlayerPool {
    PlayerPool::new(name, vec![AttributeFilter::new("level", min, max)])
}

/// A genuine proposal whose single roster carries the given player ids
pub fn proposal(id: &str, player_ids: &[&str]) -> MatchObject {
    MatchObject {
        id: id.to_string(),
        properties: r#"{"demo":true}"#.to_string(),
        rosters: vec![Roster::from_ids(
            "red-team",
            player_ids.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )],
        ..Default::default()
    }
}

/// An error-flagged match object
pub fn error_report(id: &str, reason: &str) -> MatchObject {
    MatchObject {
        id: id.to_string(),
        error: reason.to_string(),
        ..Default::default()
    }
}
