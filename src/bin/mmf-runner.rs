//! MMF Runner - demonstration matchmaking function worker
//!
//! Runs one matchmaking attempt against an embedded in-memory orchestration
//! stack: seeds synthetic players, installs a demo profile, drains the player
//! pools, fills rosters first-fit, and submits the proposal.
//!
//! Usage:
//!   cargo run --bin mmf-runner -- --players 16
//!   MMF_PROFILE_ID=profile-demo MMF_PROPOSAL_ID=proposal-1 MMF_ERROR_ID=error-1 \
//!     cargo run --bin mmf-runner
//!
//! The process exits 0 even when the run reports an error: job schedulers
//! restart non-zero exits indefinitely, so all failure reporting flows
//! through the proposal's error field and the logs.

use clap::Parser;
use pool_hall::amqp::publisher::InMemoryProposalQueue;
use pool_hall::config::AppConfig;
use pool_hall::ignore::store::InMemoryIgnoreListStore;
use pool_hall::ignore::IgnoreListStore;
use pool_hall::pool::engine::PoolFilterEngine;
use pool_hall::proposal::pipeline::ProposalPipeline;
use pool_hall::service::api::OrchestrationService;
use pool_hall::store::players::{InMemoryPlayerRepository, PlayerRepository};
use pool_hall::store::profiles::{InMemoryProfileStore, ProfileStore};
use pool_hall::store::proposals::{InMemoryProposalStore, ProposalStore};
use pool_hall::types::{AttributeFilter, AttributeValue, Player, PlayerPool, Profile};
use pool_hall::worker::{MatchStrategy, MmfHarness, WorkerSettings};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "mmf-runner",
    about = "Run one demonstration MMF attempt against an embedded orchestration stack"
)]
struct Cli {
    /// Profile identifier (MMF_PROFILE_ID overrides)
    #[arg(long, default_value = "profile-demo")]
    profile_id: String,

    /// Proposal identifier (MMF_PROPOSAL_ID overrides)
    #[arg(long, default_value = "proposal-demo")]
    proposal_id: String,

    /// Error identifier (MMF_ERROR_ID overrides)
    #[arg(long, default_value = "error-demo")]
    error_id: String,

    /// Number of synthetic players to seed
    #[arg(long, default_value = "16")]
    players: usize,

    /// Players to pre-reserve on the proposed list before the run
    #[arg(long, default_value = "0")]
    reserved: usize,

    /// Roster slots per team in the demo profile
    #[arg(long, default_value = "4")]
    team_size: usize,
}

/// Fills roster slots in document order from their declared pools
struct FirstFitStrategy;

impl MatchStrategy for FirstFitStrategy {
    fn make_matches(
        &self,
        properties: &Value,
        pools: &HashMap<String, PlayerPool>,
    ) -> pool_hall::Result<Value> {
        let mut result = properties.clone();
        let mut cursors: HashMap<String, usize> = HashMap::new();

        if let Some(rosters) = result
            .pointer_mut("/properties/rosters")
            .and_then(Value::as_array_mut)
        {
            for roster in rosters {
                if let Some(slots) = roster.get_mut("players").and_then(Value::as_array_mut) {
                    for slot in slots {
                        if !slot.is_object() {
                            continue;
                        }
                        let pool_name = match slot.get("pool").and_then(Value::as_str) {
                            Some(name) => name.to_string(),
                            None => continue,
                        };
                        let cursor = cursors.entry(pool_name.clone()).or_insert(0);
                        if let Some(player) = pools
                            .get(&pool_name)
                            .and_then(|pool| pool.roster.players.get(*cursor))
                        {
                            slot["id"] = Value::String(player.id.clone());
                            *cursor += 1;
                            println!(
                                "Selected player {} from pool '{}' (strategy: first-fit)",
                                slot["id"], pool_name
                            );
                        }
                    }
                }
            }
        }

        Ok(result)
    }
}

/// Demo profile: one pool over everyone level 1-100, two teams drawing from it
fn demo_profile(profile_id: &str, team_size: usize) -> Profile {
    let slot = json!({"pool": "everyone"});
    let team = |name: &str| {
        json!({
            "name": name,
            "players": vec![slot.clone(); team_size],
        })
    };
    let properties = json!({
        "properties": {
            "rosters": [team("red-team"), team("blue-team")]
        }
    });

    Profile {
        id: profile_id.to_string(),
        properties: properties.to_string(),
        pools: vec![PlayerPool::new(
            "everyone",
            vec![AttributeFilter::new("level", 1, 100)],
        )],
    }
}

fn seed_players(players: &dyn PlayerRepository, count: usize) -> pool_hall::Result<()> {
    for i in 0..count {
        let mut p = Player::with_id(format!("player-{:04}", i));
        p.attributes.insert(
            "level".to_string(),
            AttributeValue::Number((i as i64 % 100) + 1),
        );
        p.attributes
            .insert("region".to_string(), AttributeValue::Text("demo".into()));
        players.upsert_player(p)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Per-job identifiers come from the environment when the scheduler
    // injects them; the CLI flags are fallbacks for local runs.
    let settings = WorkerSettings::from_env().unwrap_or_else(|_| {
        WorkerSettings::new(&cli.profile_id, &cli.proposal_id, &cli.error_id)
    });

    let config = AppConfig::default();
    println!(
        "Running one MMF attempt in-process (a deployed worker would dial {})",
        MmfHarness::api_endpoint(&config)
    );

    // Embedded stack: in-memory stores plus an in-memory evaluator queue.
    let profiles = Arc::new(InMemoryProfileStore::new());
    let players = Arc::new(InMemoryPlayerRepository::new());
    let ignore = Arc::new(InMemoryIgnoreListStore::new());
    let proposals = Arc::new(InMemoryProposalStore::new());
    let queue = Arc::new(InMemoryProposalQueue::new());

    let engine = PoolFilterEngine::new(
        players.clone(),
        ignore.clone(),
        config.ignore_lists.clone(),
        config.engine,
    );
    let pipeline = ProposalPipeline::new(
        ignore.clone(),
        proposals.clone(),
        queue.clone(),
        config.pipeline,
    );
    let api = Arc::new(OrchestrationService::new(
        profiles.clone(),
        engine,
        pipeline,
        ignore.clone(),
        config.ignore_lists.clone(),
    ));

    if let Err(e) = seed_players(players.as_ref(), cli.players) {
        eprintln!("Failed to seed players: {}", e);
        return;
    }
    if cli.reserved > 0 {
        let reserved: Vec<String> = (0..cli.reserved.min(cli.players))
            .map(|i| format!("player-{:04}", i))
            .collect();
        if let Err(e) = ignore.append("proposed", &reserved) {
            eprintln!("Failed to pre-reserve players: {}", e);
            return;
        }
        println!("Pre-reserved {} player(s) on the proposed list", reserved.len());
    }
    if let Err(e) = profiles.put_profile(demo_profile(&settings.profile_id, cli.team_size)) {
        eprintln!("Failed to install demo profile: {}", e);
        return;
    }

    println!(
        "Seeded {} players, profile '{}' installed",
        cli.players, settings.profile_id
    );

    let proposal_id = settings.proposal_id.clone();
    let error_id = settings.error_id.clone();
    let harness = MmfHarness::new(api, settings);

    match harness.run(&FirstFitStrategy).await {
        Ok(ack) => {
            println!("MMF run acknowledged - success: {}", ack.success);

            if let Ok(Some(proposal)) = proposals.fetch(&proposal_id) {
                println!(
                    "Proposal '{}' persisted with {} roster(s)",
                    proposal.id,
                    proposal.rosters.len()
                );
                for roster in &proposal.rosters {
                    let ids: Vec<&str> =
                        roster.players.iter().map(|p| p.id.as_str()).collect();
                    println!("  {}: {}", roster.name, ids.join(", "));
                }
            }
            if let Ok(Some(report)) = proposals.fetch(&error_id) {
                println!("Error report '{}' persisted: {}", report.id, report.error);
            }

            println!("Evaluator queue: {:?}", queue.pending());
            if let Ok(count) = ignore.list_len("proposed") {
                println!("Players now reserved on the proposed list: {}", count);
            }
        }
        Err(e) => {
            // Reported through logs only; the exit code stays successful so
            // the scheduler does not loop this job forever.
            eprintln!("MMF run failed: {:#}", e);
        }
    }
}
