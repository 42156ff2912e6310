//! Proposal pipeline implementation
//!
//! The central correctness property here is dual-write consistency: players
//! must never stay reserved on the ignore list without a corresponding
//! persisted proposal, and a persisted proposal must have its players
//! reserved. Persistence is retried with idempotent keys; if it ultimately
//! fails, the reservation this submission made is rolled back before the
//! error is surfaced.

use crate::amqp::publisher::ProposalQueue;
use crate::config::ignore::PROPOSED_LIST;
use crate::error::OrchestratorError;
use crate::ignore::store::IgnoreListStore;
use crate::metrics::MetricsCollector;
use crate::store::proposals::ProposalStore;
use crate::types::{MatchObject, PlayerId, ProposalOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Proposal pipeline tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Additional persistence attempts after the first failure
    pub max_persist_retries: u32,
    /// Base retry delay in milliseconds (doubles per attempt)
    pub retry_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_persist_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Classified form of a submitted match object
#[derive(Debug)]
enum Submission {
    /// Worker-reported domain error; persisted for audit, nothing reserved
    ErrorReport { reason: String },
    /// Genuine proposal with the distinct players to reserve
    Proposal { players: Vec<PlayerId> },
}

/// Validate a match object against the submission invariants and classify it.
///
/// The `error` field is the server-side discriminant; workers additionally
/// encode the outcome in the identifier they write under, but the service
/// never needs to know those per-job identifier values.
fn classify(proposal: &MatchObject) -> crate::error::Result<Submission> {
    if proposal.id.is_empty() {
        return Err(OrchestratorError::InvalidMatchObject {
            reason: "match object id cannot be empty".to_string(),
        }
        .into());
    }

    if !proposal.error.is_empty() {
        return Ok(Submission::ErrorReport {
            reason: proposal.error.clone(),
        });
    }

    if proposal.rosters.is_empty() {
        return Err(OrchestratorError::InvalidMatchObject {
            reason: "proposal carries no rosters".to_string(),
        }
        .into());
    }

    let players = proposal.distinct_player_ids();
    if players.is_empty() {
        return Err(OrchestratorError::InvalidMatchObject {
            reason: "proposal rosters contain no players".to_string(),
        }
        .into());
    }

    Ok(Submission::Proposal { players })
}

/// The proposal pipeline
#[derive(Clone)]
pub struct ProposalPipeline {
    ignore: Arc<dyn IgnoreListStore>,
    proposals: Arc<dyn ProposalStore>,
    queue: Arc<dyn ProposalQueue>,
    settings: PipelineSettings,
    metrics: Arc<MetricsCollector>,
}

impl ProposalPipeline {
    /// Create a new pipeline with a default metrics collector
    pub fn new(
        ignore: Arc<dyn IgnoreListStore>,
        proposals: Arc<dyn ProposalStore>,
        queue: Arc<dyn ProposalQueue>,
        settings: PipelineSettings,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));
        Self::with_metrics(ignore, proposals, queue, settings, metrics)
    }

    /// Create a new pipeline with a shared metrics collector
    pub fn with_metrics(
        ignore: Arc<dyn IgnoreListStore>,
        proposals: Arc<dyn ProposalStore>,
        queue: Arc<dyn ProposalQueue>,
        settings: PipelineSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            ignore,
            proposals,
            queue,
            settings,
            metrics,
        }
    }

    /// Submit a completed match object.
    ///
    /// Error-flagged objects are persisted only. Genuine proposals reserve
    /// their players, persist, and enqueue for the evaluator; the whole
    /// sequence is idempotent per proposal key, so callers may safely retry
    /// a failed submission.
    pub async fn submit(&self, proposal: MatchObject) -> crate::error::Result<ProposalOutcome> {
        let started = std::time::Instant::now();
        let key = proposal.id.clone();

        let outcome = match classify(&proposal)? {
            Submission::ErrorReport { reason } => {
                info!(
                    "Recording error-flagged match object - key: '{}', reason: '{}'",
                    key, reason
                );
                self.persist_with_retry(&key, &proposal).await?;
                self.metrics
                    .proposal()
                    .proposals_total
                    .with_label_values(&["error_recorded"])
                    .inc();
                ProposalOutcome::ErrorRecorded { key, reason }
            }
            Submission::Proposal { players } => {
                info!(
                    "Submitting proposal - key: '{}', rosters: {}, distinct players: {}",
                    key,
                    proposal.rosters.len(),
                    players.len()
                );

                // Reserve players first so a concurrent scan stops offering
                // them as early as possible; keep the exact set we inserted
                // for rollback.
                let newly_reserved = self.ignore.append(PROPOSED_LIST, &players)?;
                self.metrics
                    .ignore()
                    .players_reserved_total
                    .inc_by(newly_reserved.len() as u64);

                if let Err(e) = self.persist_with_retry(&key, &proposal).await {
                    warn!(
                        "Persistence failed for proposal '{}', rolling back {} reservations",
                        key,
                        newly_reserved.len()
                    );
                    if let Err(rollback_err) = self.ignore.remove(PROPOSED_LIST, &newly_reserved)
                    {
                        error!(
                            "Rollback of ignore-list reservations failed for proposal '{}': {}",
                            key, rollback_err
                        );
                    } else {
                        self.metrics.ignore().reserve_rollbacks_total.inc();
                    }
                    return Err(e);
                }

                // Resubmission after an enqueue failure is idempotent: the
                // append above is a no-op, persist overwrites the same key,
                // and the queue deduplicates keys.
                self.queue.enqueue_proposal(&key).await?;

                self.metrics
                    .proposal()
                    .proposals_total
                    .with_label_values(&["committed"])
                    .inc();
                ProposalOutcome::Committed {
                    key,
                    players_reserved: players.len(),
                }
            }
        };

        self.metrics
            .proposal()
            .submit_duration_seconds
            .observe(started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Persist with bounded exponential backoff; failures after the final
    /// attempt surface as StorageUnavailable.
    async fn persist_with_retry(
        &self,
        key: &str,
        proposal: &MatchObject,
    ) -> crate::error::Result<()> {
        let mut attempt = 0;
        let mut delay = Duration::from_millis(self.settings.retry_delay_ms);

        loop {
            match self.proposals.persist(key, proposal) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.settings.max_persist_retries {
                        error!(
                            "Failed to persist proposal '{}' after {} retries: {}",
                            key, self.settings.max_persist_retries, e
                        );
                        return Err(OrchestratorError::StorageUnavailable {
                            message: format!("Persist retries exhausted for {}: {}", key, e),
                        }
                        .into());
                    }

                    warn!(
                        "Persist attempt {} failed for proposal '{}': {}. Retrying in {:?}",
                        attempt, key, e, delay
                    );
                    self.metrics.proposal().persist_retries_total.inc();

                    sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as u64 * 2).min(2000));
                }
            }
        }
    }
}
