//! Integration tests for the pool-hall orchestration service
//!
//! These tests drive the full orchestration surface end to end: pool
//! scanning with ignore-list exclusion, proposal submission side effects,
//! and the error-report path.

mod fixtures;

use fixtures::{
    build_stack, build_stack_with_chunk_size, error_report, level_pool, player, profile,
    proposal, seed_levelled_players,
};
use pool_hall::config::ignore::PROPOSED_LIST;
use pool_hall::drain_into_pool;
use pool_hall::error::{wire_code, OrchestratorError};
use pool_hall::ignore::IgnoreListStore;
use pool_hall::store::players::PlayerRepository;
use pool_hall::store::profiles::ProfileStore;
use pool_hall::store::proposals::ProposalStore;
use pool_hall::types::PlayerPool;
use pool_hall::MmfOrchestration;
use std::collections::HashSet;
use tokio_stream::StreamExt;

#[tokio::test]
async fn test_empty_filter_pool_returns_all_non_ignored_players_chunked() {
    let stack = build_stack_with_chunk_size(10);
    seed_levelled_players(&stack.players, 25, 50);

    let stream = stack
        .service
        .get_player_pool(PlayerPool::new("everyone", vec![]))
        .await
        .unwrap();

    let mut distinct = HashSet::new();
    let mut chunk_count = 0;
    let mut final_stats = None;
    let mut stream = stream;
    while let Some(item) = stream.next().await {
        let chunk = item.unwrap();
        chunk_count += 1;
        for p in &chunk.roster.players {
            distinct.insert(p.id.clone());
        }
        if chunk.finished {
            final_stats = Some(chunk.stats);
        }
    }

    // Final stats.count equals the number of distinct ids emitted
    assert_eq!(distinct.len(), 25);
    assert_eq!(final_stats.unwrap().count, 25);
    assert_eq!(chunk_count, 3);
}

#[tokio::test]
async fn test_scenario_red_pool_with_two_ignored_players() {
    // Profile with pools [{name:"red", filter:{level:[1,100]}}], 3 players
    // with level 50, 2 of them already ignored
    let stack = build_stack();
    seed_levelled_players(&stack.players, 3, 50);
    stack
        .ignore
        .append(PROPOSED_LIST, &["p0000".to_string(), "p0001".to_string()])
        .unwrap();

    let stream = stack
        .service
        .get_player_pool(level_pool("red", 1, 100))
        .await
        .unwrap();
    let pool = drain_into_pool(level_pool("red", 1, 100), stream)
        .await
        .unwrap();

    // Exactly 1 player streams through, final stats.count == 1
    assert_eq!(pool.roster.players.len(), 1);
    assert_eq!(pool.roster.players[0].id, "p0002");
    assert_eq!(pool.stats.count, 1);
}

#[tokio::test]
async fn test_scenario_error_match_object_is_success_and_leaves_ignore_untouched() {
    // MatchObject{id:"error-id", error:"insufficient players"} submitted
    let stack = build_stack();

    let ack = stack
        .service
        .create_proposal(error_report("error-id", "insufficient players"))
        .await
        .unwrap();

    // Result{success:true}, ignore list unchanged
    assert!(ack.success);
    assert_eq!(stack.ignore.list_len(PROPOSED_LIST).unwrap(), 0);
    assert!(stack.queue.pending().is_empty());

    // The report itself is persisted for audit
    let stored = stack.proposals.fetch("error-id").unwrap().unwrap();
    assert_eq!(stored.error, "insufficient players");
}

#[tokio::test]
async fn test_error_report_never_reserves_players_regardless_of_rosters() {
    let stack = build_stack();

    let mut report = proposal("error-id", &["p1", "p2", "p3"]);
    report.error = "matchmaking timed out".to_string();

    let ack = stack.service.create_proposal(report).await.unwrap();
    assert!(ack.success);
    assert_eq!(stack.ignore.list_len(PROPOSED_LIST).unwrap(), 0);
}

#[tokio::test]
async fn test_valid_proposal_reserves_each_distinct_player_exactly_once() {
    let stack = build_stack();

    // p2 appears in both rosters
    let mut mo = proposal("proposal-1", &["p1", "p2"]);
    mo.rosters.push(pool_hall::types::Roster::from_ids(
        "blue-team",
        vec!["p2".to_string(), "p3".to_string()],
    ));

    let ack = stack.service.create_proposal(mo).await.unwrap();
    assert!(ack.success);

    let listed = stack
        .ignore
        .list_players(PROPOSED_LIST, pool_hall::ignore::ListWindow::all())
        .unwrap();
    assert_eq!(listed.len(), 3);
    let unique: HashSet<_> = listed.iter().collect();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn test_proposed_players_are_excluded_from_every_subsequent_scan() {
    let stack = build_stack();
    seed_levelled_players(&stack.players, 6, 50);

    stack
        .service
        .create_proposal(proposal("proposal-1", &["p0001", "p0004"]))
        .await
        .unwrap();

    // Even a pool whose filters they would pass excludes them now
    let stream = stack
        .service
        .get_player_pool(level_pool("red", 1, 100))
        .await
        .unwrap();
    let pool = drain_into_pool(level_pool("red", 1, 100), stream)
        .await
        .unwrap();

    let ids: Vec<&str> = pool.roster.players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p0000", "p0002", "p0003", "p0005"]);
    assert_eq!(pool.stats.count, 4);
}

#[tokio::test]
async fn test_ignore_append_idempotence_through_the_service() {
    let stack = build_stack();

    stack
        .service
        .create_proposal(proposal("proposal-1", &["p1", "p2"]))
        .await
        .unwrap();
    // A different proposal naming an already-reserved player
    stack
        .service
        .create_proposal(proposal("proposal-2", &["p2", "p3"]))
        .await
        .unwrap();

    assert_eq!(stack.ignore.list_len(PROPOSED_LIST).unwrap(), 3);
}

#[tokio::test]
async fn test_get_all_ignored_players_unions_configured_lists() {
    let stack = build_stack();
    stack
        .ignore
        .append(PROPOSED_LIST, &["p1".to_string()])
        .unwrap();
    stack.ignore.append("banned", &["p2".to_string()]).unwrap();

    let roster = stack.service.get_all_ignored_players().await.unwrap();
    let ids: HashSet<String> = roster.players.iter().map(|p| p.id.clone()).collect();
    assert!(ids.contains("p1"));
    assert!(ids.contains("p2"));
}

#[tokio::test]
async fn test_profile_fetch_is_all_or_nothing() {
    let stack = build_stack();
    stack
        .profiles
        .put_profile(profile("profile-1", vec![level_pool("red", 1, 100)]))
        .unwrap();

    let fetched = stack.service.get_profile("profile-1").await.unwrap();
    assert_eq!(fetched.pools.len(), 1);
    assert_eq!(fetched.pools[0].name, "red");

    let err = stack.service.get_profile("absent").await.unwrap_err();
    assert_eq!(wire_code(&err), "not_found");
}

#[tokio::test]
async fn test_mixed_attribute_schemas_filter_correctly() {
    let stack = build_stack();
    stack
        .players
        .upsert_player(player("rookie", &[("level", 3)]))
        .unwrap();
    stack
        .players
        .upsert_player(player("veteran", &[("level", 80), ("ping", 20)]))
        .unwrap();
    // No level attribute at all: non-match, not an error
    stack
        .players
        .upsert_player(player("anonymous", &[("ping", 15)]))
        .unwrap();

    let stream = stack
        .service
        .get_player_pool(level_pool("veterans", 50, 100))
        .await
        .unwrap();
    let pool = drain_into_pool(level_pool("veterans", 50, 100), stream)
        .await
        .unwrap();

    assert_eq!(pool.roster.players.len(), 1);
    assert_eq!(pool.roster.players[0].id, "veteran");
}

#[tokio::test]
async fn test_invalid_match_object_is_invalid_argument() {
    let stack = build_stack();

    let err = stack
        .service
        .create_proposal(proposal("proposal-1", &[]))
        .await
        .unwrap_err();
    assert_eq!(wire_code(&err), "invalid_argument");

    let err = err.downcast_ref::<OrchestratorError>().unwrap();
    assert!(matches!(err, OrchestratorError::InvalidMatchObject { .. }));
}
