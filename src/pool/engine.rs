//! Pool filter engine: scan-and-stream retrieval of player pools
//!
//! A scan snapshots the candidate set and the ignore-list union at the moment
//! it is accepted, evaluates the pool's filters conjunctively, and emits the
//! matching roster in bounded-size chunks through a backpressured channel.
//! Each chunk carries cumulative statistics; the final chunk is flagged and
//! its statistics are authoritative. An empty result still produces exactly
//! one finished chunk so callers can tell "pool matched nothing" apart from a
//! broken stream.

use crate::config::ignore::IgnoreListSettings;
use crate::ignore::store::{union_ignored, IgnoreListStore};
use crate::metrics::MetricsCollector;
use crate::pool::filter;
use crate::store::players::PlayerRepository;
use crate::types::{Player, PlayerId, PlayerPool, PoolChunk, PoolStats, Roster};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Smallest supported chunk size
pub const MIN_CHUNK_SIZE: usize = 10;
/// Largest supported chunk size; larger pages risk oversized messages
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Pool filter engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Players per streamed chunk
    pub chunk_size: usize,
    /// Bounded channel capacity between scan task and consumer
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            channel_capacity: 8,
        }
    }
}

/// Stream of pool-scan result chunks
pub type PoolStream = ReceiverStream<crate::error::Result<PoolChunk>>;

/// The pool filter engine
#[derive(Clone)]
pub struct PoolFilterEngine {
    /// Candidate player source
    players: Arc<dyn PlayerRepository>,
    /// Exclusion set source
    ignore: Arc<dyn IgnoreListStore>,
    /// Which lists (and windows) make up the exclusion set
    ignore_windows: IgnoreListSettings,
    settings: EngineSettings,
    metrics: Arc<MetricsCollector>,
}

impl PoolFilterEngine {
    /// Create a new engine with a default metrics collector
    pub fn new(
        players: Arc<dyn PlayerRepository>,
        ignore: Arc<dyn IgnoreListStore>,
        ignore_windows: IgnoreListSettings,
        settings: EngineSettings,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));
        Self::with_metrics(players, ignore, ignore_windows, settings, metrics)
    }

    /// Create a new engine with a shared metrics collector
    pub fn with_metrics(
        players: Arc<dyn PlayerRepository>,
        ignore: Arc<dyn IgnoreListStore>,
        ignore_windows: IgnoreListSettings,
        mut settings: EngineSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let clamped = settings.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        if clamped != settings.chunk_size {
            debug!(
                "Clamping pool chunk size {} to supported range [{}, {}]",
                settings.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            );
            settings.chunk_size = clamped;
        }
        settings.channel_capacity = settings.channel_capacity.max(1);

        Self {
            players,
            ignore,
            ignore_windows,
            settings,
            metrics,
        }
    }

    /// Start a scan for the given pool and return its result stream.
    ///
    /// The filter specification is validated and both snapshots are taken
    /// before this returns, so the stream observes state no older than the
    /// start of the scan. Dropping the returned stream cancels the scan.
    pub fn scan_pool(&self, pool: &PlayerPool) -> crate::error::Result<PoolStream> {
        filter::validate_filters(&pool.filters)?;

        let started = Instant::now();
        let ignored = union_ignored(self.ignore.as_ref(), &self.ignore_windows.lists)?;
        let candidates = self.players.snapshot()?;

        debug!(
            "Starting pool scan - pool: '{}', filters: {}, candidates: {}, ignored: {}",
            pool.name,
            pool.filters.len(),
            candidates.len(),
            ignored.len()
        );
        self.metrics.pool().scans_started_total.inc();

        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        tokio::spawn(scan_task(
            pool.name.clone(),
            pool.filters.clone(),
            candidates,
            ignored,
            self.settings.chunk_size,
            started,
            tx,
            self.metrics.clone(),
        ));

        Ok(ReceiverStream::new(rx))
    }
}

/// Scan worker: filters the snapshot and streams chunks until done or the
/// consumer goes away.
#[allow(clippy::too_many_arguments)]
async fn scan_task(
    pool_name: String,
    filters: Vec<crate::types::AttributeFilter>,
    candidates: Vec<Player>,
    ignored: HashSet<PlayerId>,
    chunk_size: usize,
    started: Instant,
    tx: mpsc::Sender<crate::error::Result<PoolChunk>>,
    metrics: Arc<MetricsCollector>,
) {
    let requested = filter::requested_attributes(&filters);
    let mut buffer: Vec<Player> = Vec::with_capacity(chunk_size);
    let mut matched_total: u64 = 0;
    let mut chunks_sent: u64 = 0;

    for candidate in &candidates {
        if ignored.contains(&candidate.id) {
            continue;
        }
        if !filter::player_matches(candidate, &filters) {
            continue;
        }

        matched_total += 1;
        buffer.push(filter::project_player(candidate, &requested));

        if buffer.len() >= chunk_size {
            let chunk = PoolChunk {
                roster: Roster {
                    name: pool_name.clone(),
                    players: std::mem::take(&mut buffer),
                },
                stats: PoolStats {
                    count: matched_total,
                    elapsed: started.elapsed().as_secs_f64(),
                },
                finished: false,
            };
            chunks_sent += 1;
            if tx.send(Ok(chunk)).await.is_err() {
                // Consumer dropped the stream; release the scan promptly.
                debug!("Pool scan cancelled by consumer - pool: '{}'", pool_name);
                metrics.pool().scans_cancelled_total.inc();
                return;
            }
        }
    }

    // Terminal chunk, possibly with an empty roster, carrying final stats.
    let final_chunk = PoolChunk {
        roster: Roster {
            name: pool_name.clone(),
            players: buffer,
        },
        stats: PoolStats {
            count: matched_total,
            elapsed: started.elapsed().as_secs_f64(),
        },
        finished: true,
    };
    chunks_sent += 1;
    if tx.send(Ok(final_chunk)).await.is_err() {
        debug!("Pool scan cancelled by consumer - pool: '{}'", pool_name);
        metrics.pool().scans_cancelled_total.inc();
        return;
    }

    debug!(
        "Pool scan complete - pool: '{}', matched: {}, chunks: {}, elapsed: {:.3}s",
        pool_name,
        matched_total,
        chunks_sent,
        started.elapsed().as_secs_f64()
    );
    metrics.pool().scans_completed_total.inc();
    metrics.pool().chunks_emitted_total.inc_by(chunks_sent);
    metrics.pool().players_matched_total.inc_by(matched_total);
    metrics
        .pool()
        .scan_duration_seconds
        .observe(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ignore::{IgnoreListWindow, PROPOSED_LIST};
    use crate::ignore::store::InMemoryIgnoreListStore;
    use crate::store::players::InMemoryPlayerRepository;
    use crate::types::{AttributeFilter, AttributeValue};
    use tokio_stream::StreamExt;

    fn seed_players(repo: &InMemoryPlayerRepository, count: usize, level: i64) {
        for i in 0..count {
            let mut p = Player::with_id(format!("p{:04}", i));
            p.attributes
                .insert("level".to_string(), AttributeValue::Number(level));
            repo.upsert_player(p).unwrap();
        }
    }

    fn engine_with(
        repo: Arc<InMemoryPlayerRepository>,
        ignore: Arc<InMemoryIgnoreListStore>,
        chunk_size: usize,
    ) -> PoolFilterEngine {
        PoolFilterEngine::new(
            repo,
            ignore,
            IgnoreListSettings::default(),
            EngineSettings {
                chunk_size,
                channel_capacity: 2,
            },
        )
    }

    async fn collect_chunks(stream: PoolStream) -> Vec<PoolChunk> {
        stream
            .map(|item| item.unwrap())
            .collect::<Vec<PoolChunk>>()
            .await
    }

    #[tokio::test]
    async fn test_empty_result_yields_single_finished_chunk() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("empty", vec![AttributeFilter::new("level", 1, 100)]);
        let chunks = collect_chunks(engine.scan_pool(&pool).unwrap()).await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].finished);
        assert!(chunks[0].roster.players.is_empty());
        assert_eq!(chunks[0].stats.count, 0);
    }

    #[tokio::test]
    async fn test_chunk_boundaries_and_cumulative_stats() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        seed_players(&repo, 25, 50);
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("everyone", vec![]);
        let chunks = collect_chunks(engine.scan_pool(&pool).unwrap()).await;

        // 25 players at chunk size 10: two full pages plus a finished tail
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].roster.players.len(), 10);
        assert_eq!(chunks[0].stats.count, 10);
        assert!(!chunks[0].finished);
        assert_eq!(chunks[1].stats.count, 20);
        assert_eq!(chunks[2].roster.players.len(), 5);
        assert_eq!(chunks[2].stats.count, 25);
        assert!(chunks[2].finished);
    }

    #[tokio::test]
    async fn test_exact_multiple_still_emits_finished_chunk() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        seed_players(&repo, 20, 50);
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("everyone", vec![]);
        let chunks = collect_chunks(engine.scan_pool(&pool).unwrap()).await;

        assert_eq!(chunks.len(), 3);
        assert!(chunks[2].finished);
        assert!(chunks[2].roster.players.is_empty());
        assert_eq!(chunks[2].stats.count, 20);
    }

    #[tokio::test]
    async fn test_ignored_players_are_excluded() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        seed_players(&repo, 3, 50);
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        ignore
            .append(PROPOSED_LIST, &["p0000".to_string(), "p0001".to_string()])
            .unwrap();
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("red", vec![AttributeFilter::new("level", 1, 100)]);
        let chunks = collect_chunks(engine.scan_pool(&pool).unwrap()).await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].stats.count, 1);
        assert_eq!(chunks[0].roster.players[0].id, "p0002");
    }

    #[tokio::test]
    async fn test_permanent_list_also_excludes() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        seed_players(&repo, 2, 50);
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        ignore.append("banned", &["p0001".to_string()]).unwrap();

        let windows = IgnoreListSettings {
            lists: vec![
                IgnoreListWindow::new(PROPOSED_LIST, 0, 800),
                IgnoreListWindow::new("banned", 0, 0),
            ],
        };
        let engine = PoolFilterEngine::new(
            repo,
            ignore,
            windows,
            EngineSettings::default(),
        );

        let pool = PlayerPool::new("everyone", vec![]);
        let chunks = collect_chunks(engine.scan_pool(&pool).unwrap()).await;
        assert_eq!(chunks[0].stats.count, 1);
        assert_eq!(chunks[0].roster.players[0].id, "p0000");
    }

    #[tokio::test]
    async fn test_invalid_filter_fails_before_streaming() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("broken", vec![AttributeFilter::new("level", 100, 1)]);
        assert!(engine.scan_pool(&pool).is_err());
    }

    #[tokio::test]
    async fn test_dropped_consumer_cancels_scan() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        seed_players(&repo, 500, 50);
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("everyone", vec![]);
        let mut stream = engine.scan_pool(&pool).unwrap();

        // Take one chunk, then drop the stream; the scan task must exit on
        // its next send rather than hang.
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.roster.players.len(), 10);
        drop(stream);

        // Give the task a moment to observe the closed channel.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_projection_limits_attributes_to_filtered_ones() {
        let repo = Arc::new(InMemoryPlayerRepository::new());
        let mut p = Player::with_id("p1");
        p.attributes
            .insert("level".to_string(), AttributeValue::Number(50));
        p.attributes
            .insert("ping".to_string(), AttributeValue::Number(30));
        repo.upsert_player(p).unwrap();
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let engine = engine_with(repo, ignore, 10);

        let pool = PlayerPool::new("red", vec![AttributeFilter::new("level", 1, 100)]);
        let chunks = collect_chunks(engine.scan_pool(&pool).unwrap()).await;

        let player = &chunks[0].roster.players[0];
        assert!(player.attributes.contains_key("level"));
        assert!(!player.attributes.contains_key("ping"));
    }
}
