//! Worker harness implementation
//!
//! Per-job identifiers arrive through the environment: the profile to serve,
//! the key to write a genuine proposal under, and the key that marks an error
//! report. The worker signals success versus failure purely by which
//! identifier it writes its match object under; the process itself must exit
//! successfully either way because the external scheduler restarts non-zero
//! jobs indefinitely.

use crate::config::app::AppConfig;
use crate::error::OrchestratorError;
use crate::pool::drain::drain_into_pool;
use crate::service::api::MmfOrchestration;
use crate::types::{MatchObject, PlayerPool, ProposalAck, Roster};
use crate::utils::json_path_lookup;
use anyhow::Context;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

/// Default dotted key path to the roster list inside a match result document
pub const DEFAULT_ROSTER_KEY_PATH: &str = "properties.rosters";

/// Per-job worker settings
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Profile to run this matchmaking attempt against
    pub profile_id: String,
    /// Key a genuine proposal is written under
    pub proposal_id: String,
    /// Key an error report is written under
    pub error_id: String,
    /// Dotted key path to the roster list in the strategy's result JSON
    pub roster_key_path: String,
}

impl WorkerSettings {
    pub fn new(
        profile_id: impl Into<String>,
        proposal_id: impl Into<String>,
        error_id: impl Into<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            proposal_id: proposal_id.into(),
            error_id: error_id.into(),
            roster_key_path: DEFAULT_ROSTER_KEY_PATH.to_string(),
        }
    }

    /// Load per-job settings from the environment.
    ///
    /// `MMF_PROFILE_ID`, `MMF_PROPOSAL_ID` and `MMF_ERROR_ID` are injected by
    /// the job scheduler; `JSONKEYS_ROSTERS` overrides the roster key path
    /// for deployments that bury match results deeper in the document.
    pub fn from_env() -> crate::error::Result<Self> {
        let read = |name: &str| -> crate::error::Result<String> {
            env::var(name).map_err(|_| {
                OrchestratorError::ConfigurationError {
                    message: format!("Missing required environment variable: {}", name),
                }
                .into()
            })
        };

        Ok(Self {
            profile_id: read("MMF_PROFILE_ID")?,
            proposal_id: read("MMF_PROPOSAL_ID")?,
            error_id: read("MMF_ERROR_ID")?,
            roster_key_path: env::var("JSONKEYS_ROSTERS")
                .unwrap_or_else(|_| DEFAULT_ROSTER_KEY_PATH.to_string()),
        })
    }
}

/// Consumer-supplied matching logic.
///
/// Receives the profile's parsed properties and each pool filled with its
/// matched players; returns the match result document the rosters will be
/// extracted from.
pub trait MatchStrategy: Send + Sync {
    fn make_matches(
        &self,
        properties: &Value,
        pools: &HashMap<String, PlayerPool>,
    ) -> crate::error::Result<Value>;
}

/// One-shot MMF run against the orchestration service
pub struct MmfHarness {
    api: Arc<dyn MmfOrchestration>,
    settings: WorkerSettings,
}

impl MmfHarness {
    pub fn new(api: Arc<dyn MmfOrchestration>, settings: WorkerSettings) -> Self {
        Self { api, settings }
    }

    /// Service connection settings an out-of-process worker would dial.
    pub fn api_endpoint(config: &AppConfig) -> String {
        format!("{}:{}", config.service.host, config.service.api_port)
    }

    /// Execute one matchmaking attempt.
    ///
    /// A failed profile fetch or an interrupted pool stream aborts the run
    /// with an error; empty pools and strategies that produce no rosters are
    /// domain outcomes, written back as error reports under the error id.
    pub async fn run(&self, strategy: &dyn MatchStrategy) -> crate::error::Result<ProposalAck> {
        let profile = self.api.get_profile(&self.settings.profile_id).await?;
        info!(
            "Fetched profile '{}' with {} pool(s)",
            profile.id,
            profile.pools.len()
        );

        let properties: Value = if profile.properties.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&profile.properties).with_context(|| {
                format!("Profile '{}' properties are not valid JSON", profile.id)
            })?
        };

        // Drain every pool stream into its definition.
        let mut filled_pools = Vec::with_capacity(profile.pools.len());
        let mut by_name: HashMap<String, PlayerPool> = HashMap::new();
        let mut total_players = 0usize;
        for pool in &profile.pools {
            let stream = self.api.get_player_pool(pool.clone()).await?;
            let filled = drain_into_pool(pool.clone(), stream).await?;
            info!(
                "Pool '{}' retrieved - players: {}, elapsed: {:.3}s",
                filled.name, filled.stats.count, filled.stats.elapsed
            );
            total_players += filled.roster.players.len();
            by_name.insert(filled.name.clone(), filled.clone());
            filled_pools.push(filled);
        }

        if total_players == 0 {
            warn!(
                "All player pools are empty for profile '{}', reporting error",
                profile.id
            );
            return self
                .submit_error_report(&profile.properties, filled_pools, "insufficient players")
                .await;
        }

        let results = strategy.make_matches(&properties, &by_name)?;
        let rosters = self.extract_rosters(&results);
        if rosters.is_empty() {
            warn!(
                "Match function produced no rosters for profile '{}', reporting error",
                profile.id
            );
            return self
                .submit_error_report(
                    &profile.properties,
                    filled_pools,
                    "match function produced no rosters",
                )
                .await;
        }

        let proposal = MatchObject {
            id: self.settings.proposal_id.clone(),
            properties: serde_json::to_string(&results)
                .context("Failed to serialize match results")?,
            error: String::new(),
            rosters,
            pools: filled_pools,
        };

        let ack = self.api.create_proposal(proposal).await?;
        info!(
            "Proposal '{}' submitted - success: {}",
            self.settings.proposal_id, ack.success
        );
        Ok(ack)
    }

    /// Write a domain error back under the error id.
    async fn submit_error_report(
        &self,
        properties: &str,
        pools: Vec<PlayerPool>,
        reason: &str,
    ) -> crate::error::Result<ProposalAck> {
        let report = MatchObject {
            id: self.settings.error_id.clone(),
            properties: properties.to_string(),
            error: reason.to_string(),
            rosters: Vec::new(),
            pools,
        };
        self.api.create_proposal(report).await
    }

    /// Pull rosters out of the strategy's result document at the configured
    /// key path. Slots the strategy never filled (players without an id) are
    /// dropped; a missing path yields no rosters.
    fn extract_rosters(&self, results: &Value) -> Vec<Roster> {
        let entries = match json_path_lookup(results, &self.settings.roster_key_path)
            .and_then(Value::as_array)
        {
            Some(entries) => entries,
            None => return Vec::new(),
        };

        entries
            .iter()
            .filter_map(|entry| serde_json::from_value::<Roster>(entry.clone()).ok())
            .map(|mut roster| {
                roster.players.retain(|p| !p.id.is_empty());
                roster
            })
            .filter(|roster| !roster.players.is_empty())
            .collect()
    }
}
