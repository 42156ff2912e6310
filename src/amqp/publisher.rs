//! Evaluator queue publishing
//!
//! The proposal pipeline's last step hands proposal keys to the external
//! evaluator. This module defines the queue seam, the AMQP-backed production
//! implementation, and an in-memory ordered queue for tests and the demo
//! runner.

use crate::amqp::messages::{
    MessageEnvelope, MessageUtils, ProposalAnnouncement, PROPOSAL_PENDING_ROUTING_KEY,
};
use crate::error::OrchestratorError;
use crate::error::Result;
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Trait for enqueueing proposals for evaluator consideration
#[async_trait]
pub trait ProposalQueue: Send + Sync {
    /// Enqueue a persisted proposal's key.
    ///
    /// Enqueueing the same key twice is a no-op so resubmission of a proposal
    /// stays idempotent end to end.
    async fn enqueue_proposal(&self, proposal_key: &str) -> Result<()>;
}

/// Configuration for proposal publishing
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub exchange_name: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            exchange_name: crate::amqp::messages::PROPOSALS_EXCHANGE.to_string(),
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// AMQP-based proposal queue implementation
pub struct AmqpProposalQueue {
    channel: Channel,
    config: PublisherConfig,
    published_keys: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl AmqpProposalQueue {
    /// Create a new proposal queue publisher and declare its exchange
    pub async fn new(channel: Channel, config: PublisherConfig) -> Result<Self> {
        let queue = Self {
            channel,
            config,
            published_keys: std::sync::Mutex::new(std::collections::HashSet::new()),
        };

        queue.setup_exchange().await?;
        Ok(queue)
    }

    /// Declare the proposals exchange
    async fn setup_exchange(&self) -> Result<()> {
        let args = ExchangeDeclareArguments::new(&self.config.exchange_name, "topic");
        self.channel.exchange_declare(args).await.map_err(|e| {
            OrchestratorError::AmqpConnectionFailed {
                message: format!("Failed to declare proposals exchange: {}", e),
            }
        })?;

        info!(
            "Declared proposals exchange '{}'",
            self.config.exchange_name
        );
        Ok(())
    }

    /// Publish an announcement with retry logic
    async fn publish_with_retry(
        &self,
        envelope: &MessageEnvelope<ProposalAnnouncement>,
    ) -> Result<()> {
        let mut retry_count = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            match self.try_publish(envelope).await {
                Ok(_) => {
                    debug!(
                        "Published proposal announcement {} to exchange {}",
                        envelope.payload.proposal_key, self.config.exchange_name
                    );
                    return Ok(());
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        error!(
                            "Failed to publish proposal {} after {} retries: {}",
                            envelope.payload.proposal_key, self.config.max_retries, e
                        );
                        return Err(OrchestratorError::QueueUnavailable {
                            message: format!(
                                "Publish retries exhausted for {}: {}",
                                envelope.payload.proposal_key, e
                            ),
                        }
                        .into());
                    }

                    warn!(
                        "Publish attempt {} failed for proposal {}: {}. Retrying in {:?}",
                        retry_count, envelope.payload.proposal_key, e, delay
                    );

                    sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as u64 * 2).min(5000));
                }
            }
        }
    }

    /// Single publish attempt
    async fn try_publish(&self, envelope: &MessageEnvelope<ProposalAnnouncement>) -> Result<()> {
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(&self.config.exchange_name, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.correlation_id)
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_content_type("application/json");

        self.channel
            .basic_publish(properties, payload, args)
            .await
            .map_err(|e| OrchestratorError::QueueUnavailable {
                message: format!("Failed to publish announcement: {}", e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl ProposalQueue for AmqpProposalQueue {
    async fn enqueue_proposal(&self, proposal_key: &str) -> Result<()> {
        let announcement = ProposalAnnouncement::new(proposal_key);
        MessageUtils::validate_announcement(&announcement)?;

        {
            let published =
                self.published_keys
                    .lock()
                    .map_err(|_| OrchestratorError::InternalError {
                        message: "Failed to acquire published keys lock".to_string(),
                    })?;
            if published.contains(proposal_key) {
                debug!("Proposal {} already enqueued, skipping", proposal_key);
                return Ok(());
            }
        }

        let envelope =
            MessageEnvelope::new(announcement, PROPOSAL_PENDING_ROUTING_KEY.to_string());
        self.publish_with_retry(&envelope).await?;

        let mut published =
            self.published_keys
                .lock()
                .map_err(|_| OrchestratorError::InternalError {
                    message: "Failed to acquire published keys lock".to_string(),
                })?;
        published.insert(proposal_key.to_string());
        Ok(())
    }
}

/// In-memory ordered proposal queue for testing and the demo runner
#[derive(Debug, Default)]
pub struct InMemoryProposalQueue {
    pending: std::sync::Mutex<Vec<String>>,
}

impl InMemoryProposalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending proposal keys in enqueue order
    pub fn pending(&self) -> Vec<String> {
        self.pending
            .lock()
            .map(|pending| pending.clone())
            .unwrap_or_default()
    }

    /// Remove and return the oldest pending key (what an evaluator would do)
    pub fn pop_front(&self) -> Option<String> {
        self.pending.lock().ok().and_then(|mut pending| {
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        })
    }
}

#[async_trait]
impl ProposalQueue for InMemoryProposalQueue {
    async fn enqueue_proposal(&self, proposal_key: &str) -> Result<()> {
        if proposal_key.is_empty() {
            return Err(OrchestratorError::InvalidMatchObject {
                reason: "Proposal key cannot be empty".to_string(),
            }
            .into());
        }

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire pending lock".to_string(),
            })?;
        if !pending.iter().any(|key| key == proposal_key) {
            pending.push(proposal_key.to_string());
        }
        Ok(())
    }
}
