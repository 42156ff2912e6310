//! Stream accumulation with explicit partial-failure semantics
//!
//! Consumers of `GetPlayerPool` previously hand-rolled the merge of streamed
//! chunks into a pool; this utility owns that loop and, critically, refuses
//! to treat a stream that ends without its finished chunk as "pool
//! exhausted".

use crate::error::OrchestratorError;
use crate::pool::engine::PoolStream;
use crate::types::{PlayerPool, Roster};
use std::collections::HashSet;
use tokio_stream::StreamExt;

/// Drain a pool-scan stream into the pool definition that produced it.
///
/// Chunk rosters are merged with player-id deduplication; the last observed
/// stats win (the finished chunk's stats are authoritative). Returns
/// `StreamInterrupted` if the stream terminates before a finished chunk
/// arrives, and propagates any error item from the producer.
pub async fn drain_into_pool(
    mut pool: PlayerPool,
    mut stream: PoolStream,
) -> crate::error::Result<PlayerPool> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut players = Vec::new();
    let mut finished = false;

    while let Some(item) = stream.next().await {
        let chunk = item?;
        pool.stats = chunk.stats;
        for player in chunk.roster.players {
            if seen.insert(player.id.clone()) {
                players.push(player);
            }
        }
        if chunk.finished {
            finished = true;
            break;
        }
    }

    if !finished {
        return Err(OrchestratorError::StreamInterrupted {
            pool: pool.name.clone(),
        }
        .into());
    }

    pool.roster = Roster {
        name: pool.name.clone(),
        players,
    };
    Ok(pool)
}
