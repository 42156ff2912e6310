//! AMQP message definitions and serialization

use crate::error::OrchestratorError;
use crate::error::Result;

/// Exchange proposal announcements are published to
pub const PROPOSALS_EXCHANGE: &str = "matchmaking.proposals";

/// Routing key for proposals awaiting evaluation
pub const PROPOSAL_PENDING_ROUTING_KEY: &str = "proposal.pending";

/// Message envelope with metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: crate::utils::generate_correlation_id(),
            timestamp: crate::utils::current_timestamp(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            OrchestratorError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize an envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            OrchestratorError::InternalError {
                message: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Announcement that a proposal is waiting for evaluator consideration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProposalAnnouncement {
    /// Key the match object was persisted under
    pub proposal_key: String,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl ProposalAnnouncement {
    pub fn new(proposal_key: impl Into<String>) -> Self {
        Self {
            proposal_key: proposal_key.into(),
            submitted_at: crate::utils::current_timestamp(),
        }
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Validate a proposal announcement before publishing
    pub fn validate_announcement(announcement: &ProposalAnnouncement) -> Result<()> {
        if announcement.proposal_key.is_empty() {
            return Err(OrchestratorError::InvalidMatchObject {
                reason: "Proposal key cannot be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_envelope_creation() {
        let announcement = ProposalAnnouncement::new("proposal-1");
        let envelope =
            MessageEnvelope::new(announcement, PROPOSAL_PENDING_ROUTING_KEY.to_string());

        assert_eq!(envelope.routing_key, PROPOSAL_PENDING_ROUTING_KEY);
        assert!(!envelope.correlation_id.is_empty());
    }

    #[test]
    fn test_envelope_serialization_roundtrip() {
        let announcement = ProposalAnnouncement::new("proposal-1");
        let envelope =
            MessageEnvelope::new(announcement, PROPOSAL_PENDING_ROUTING_KEY.to_string());

        let bytes = envelope.to_bytes().unwrap();
        let decoded: MessageEnvelope<ProposalAnnouncement> =
            MessageEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.payload.proposal_key, "proposal-1");
        assert_eq!(decoded.correlation_id, envelope.correlation_id);
    }

    #[test]
    fn test_announcement_validation() {
        let valid = ProposalAnnouncement::new("proposal-1");
        assert!(MessageUtils::validate_announcement(&valid).is_ok());

        let invalid = ProposalAnnouncement::new("");
        assert!(MessageUtils::validate_announcement(&invalid).is_err());
    }
}
