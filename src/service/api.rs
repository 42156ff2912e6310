//! MMF orchestration protocol surface
//!
//! The request/response and request/stream contract exposed to MMF worker
//! processes. Workers are short-lived jobs, one per matchmaking attempt;
//! everything they need goes through this trait.

use crate::config::ignore::IgnoreListSettings;
use crate::error::{wire_code, OrchestratorError};
use crate::ignore::store::{union_ignored, IgnoreListStore, ListWindow};
use crate::metrics::MetricsCollector;
use crate::pool::engine::{PoolFilterEngine, PoolStream};
use crate::proposal::pipeline::ProposalPipeline;
use crate::store::profiles::ProfileStore;
use crate::types::{MatchObject, PlayerPool, Profile, ProposalAck, Roster};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// The orchestration contract MMF workers program against
#[async_trait]
pub trait MmfOrchestration: Send + Sync {
    /// Fetch a profile by identifier; NotFound if absent, never partial
    async fn get_profile(&self, profile_id: &str) -> crate::error::Result<Profile>;

    /// Start a pool scan and stream its result chunks
    async fn get_player_pool(&self, pool: PlayerPool) -> crate::error::Result<PoolStream>;

    /// Submit a completed match object (proposal or error report)
    async fn create_proposal(&self, proposal: MatchObject) -> crate::error::Result<ProposalAck>;

    /// All ignored players across every configured list window
    async fn get_all_ignored_players(&self) -> crate::error::Result<Roster>;

    /// Ignored players on one configured list; NotFound for unknown lists
    async fn list_ignored_players(&self, list: &str) -> crate::error::Result<Roster>;

    /// Return players from an ignore list to matchmaking consideration.
    ///
    /// Promotion and expiry belong to the external evaluator; this surface
    /// exists for it and deliberately signals Unimplemented so callers can
    /// tell "server not ready" from a legitimately empty result.
    async fn release_ignored_players(
        &self,
        list: &str,
        players: Roster,
    ) -> crate::error::Result<()>;
}

/// Production implementation wiring the engine, pipeline and stores
#[derive(Clone)]
pub struct OrchestrationService {
    profiles: Arc<dyn ProfileStore>,
    engine: PoolFilterEngine,
    pipeline: ProposalPipeline,
    ignore: Arc<dyn IgnoreListStore>,
    ignore_windows: IgnoreListSettings,
    metrics: Arc<MetricsCollector>,
}

impl OrchestrationService {
    /// Create a new orchestration service with a default metrics collector
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        engine: PoolFilterEngine,
        pipeline: ProposalPipeline,
        ignore: Arc<dyn IgnoreListStore>,
        ignore_windows: IgnoreListSettings,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));
        Self::with_metrics(profiles, engine, pipeline, ignore, ignore_windows, metrics)
    }

    /// Create a new orchestration service with a shared metrics collector
    pub fn with_metrics(
        profiles: Arc<dyn ProfileStore>,
        engine: PoolFilterEngine,
        pipeline: ProposalPipeline,
        ignore: Arc<dyn IgnoreListStore>,
        ignore_windows: IgnoreListSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            profiles,
            engine,
            pipeline,
            ignore,
            ignore_windows,
            metrics,
        }
    }

    fn observe<T>(&self, method: &str, result: crate::error::Result<T>) -> crate::error::Result<T> {
        self.metrics.record_request(method);
        if let Err(err) = &result {
            self.metrics.record_request_error(method, wire_code(err));
        }
        result
    }
}

#[async_trait]
impl MmfOrchestration for OrchestrationService {
    async fn get_profile(&self, profile_id: &str) -> crate::error::Result<Profile> {
        let result = self.profiles.get_profile(profile_id).and_then(|found| {
            found.ok_or_else(|| {
                OrchestratorError::ProfileNotFound {
                    profile_id: profile_id.to_string(),
                }
                .into()
            })
        });
        self.observe("get_profile", result)
    }

    async fn get_player_pool(&self, pool: PlayerPool) -> crate::error::Result<PoolStream> {
        let result = self.engine.scan_pool(&pool);
        self.observe("get_player_pool", result)
    }

    async fn create_proposal(&self, proposal: MatchObject) -> crate::error::Result<ProposalAck> {
        let result = self.pipeline.submit(proposal).await.map(|outcome| {
            info!(
                "Proposal submission acknowledged - key: '{}'",
                outcome.key()
            );
            outcome.ack()
        });
        self.observe("create_proposal", result)
    }

    async fn get_all_ignored_players(&self) -> crate::error::Result<Roster> {
        let result = union_ignored(self.ignore.as_ref(), &self.ignore_windows.lists).map(
            |ignored| {
                let mut ids: Vec<String> = ignored.into_iter().collect();
                ids.sort();
                Roster::from_ids("all_ignored", ids)
            },
        );
        self.observe("get_all_ignored_players", result)
    }

    async fn list_ignored_players(&self, list: &str) -> crate::error::Result<Roster> {
        let result = match self.ignore_windows.find(list) {
            Some(window) => self
                .ignore
                .list_players(list, ListWindow::from(window))
                .map(|ids| Roster::from_ids(list, ids)),
            None => Err(OrchestratorError::IgnoreListNotFound {
                list: list.to_string(),
            }
            .into()),
        };
        self.observe("list_ignored_players", result)
    }

    async fn release_ignored_players(
        &self,
        _list: &str,
        _players: Roster,
    ) -> crate::error::Result<()> {
        let result = Err(OrchestratorError::Unimplemented {
            method: "ReleaseIgnoredPlayers".to_string(),
        }
        .into());
        self.observe("release_ignored_players", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::publisher::InMemoryProposalQueue;
    use crate::config::ignore::PROPOSED_LIST;
    use crate::ignore::store::InMemoryIgnoreListStore;
    use crate::pool::engine::EngineSettings;
    use crate::proposal::pipeline::PipelineSettings;
    use crate::store::players::InMemoryPlayerRepository;
    use crate::store::profiles::InMemoryProfileStore;
    use crate::store::proposals::InMemoryProposalStore;

    fn service() -> (OrchestrationService, Arc<InMemoryIgnoreListStore>) {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let players = Arc::new(InMemoryPlayerRepository::new());
        let ignore = Arc::new(InMemoryIgnoreListStore::new());
        let proposals = Arc::new(InMemoryProposalStore::new());
        let queue = Arc::new(InMemoryProposalQueue::new());
        let windows = IgnoreListSettings::default();

        let engine = PoolFilterEngine::new(
            players,
            ignore.clone(),
            windows.clone(),
            EngineSettings::default(),
        );
        let pipeline = ProposalPipeline::new(
            ignore.clone(),
            proposals,
            queue,
            PipelineSettings::default(),
        );

        (
            OrchestrationService::new(profiles, engine, pipeline, ignore.clone(), windows),
            ignore,
        )
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let (service, _) = service();
        let err = service.get_profile("absent").await.unwrap_err();
        let orch = err.downcast_ref::<OrchestratorError>().unwrap();
        assert!(matches!(orch, OrchestratorError::ProfileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_unknown_ignore_list_is_not_found() {
        let (service, _) = service();
        let err = service.list_ignored_players("mystery").await.unwrap_err();
        assert_eq!(wire_code(&err), "not_found");
    }

    #[tokio::test]
    async fn test_list_configured_ignore_list() {
        let (service, ignore) = service();
        ignore
            .append(PROPOSED_LIST, &["p1".to_string(), "p2".to_string()])
            .unwrap();

        let roster = service.list_ignored_players(PROPOSED_LIST).await.unwrap();
        assert_eq!(roster.players.len(), 2);
    }

    #[tokio::test]
    async fn test_release_is_unimplemented() {
        let (service, _) = service();
        let err = service
            .release_ignored_players(PROPOSED_LIST, Roster::default())
            .await
            .unwrap_err();
        assert_eq!(wire_code(&err), "unimplemented");
    }
}
