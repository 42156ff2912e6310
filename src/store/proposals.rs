//! Proposal storage interface and in-memory implementation

use crate::error::OrchestratorError;
use crate::types::MatchObject;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for persisted match object storage.
///
/// `persist` is an idempotent overwrite keyed by the proposal identifier, so
/// the pipeline can safely retry and callers can safely resubmit.
pub trait ProposalStore: Send + Sync {
    /// Persist a match object under the given key
    fn persist(&self, key: &str, proposal: &MatchObject) -> crate::error::Result<()>;

    /// Fetch a persisted match object
    fn fetch(&self, key: &str) -> crate::error::Result<Option<MatchObject>>;

    /// Number of persisted match objects
    fn proposal_count(&self) -> crate::error::Result<usize>;
}

/// In-memory proposal store implementation
#[derive(Debug, Default)]
pub struct InMemoryProposalStore {
    proposals: RwLock<HashMap<String, MatchObject>>,
}

impl InMemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProposalStore for InMemoryProposalStore {
    fn persist(&self, key: &str, proposal: &MatchObject) -> crate::error::Result<()> {
        if key.is_empty() {
            return Err(OrchestratorError::InvalidMatchObject {
                reason: "proposal key cannot be empty".to_string(),
            }
            .into());
        }

        let mut proposals = self
            .proposals
            .write()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire proposal write lock".to_string(),
            })?;
        proposals.insert(key.to_string(), proposal.clone());
        Ok(())
    }

    fn fetch(&self, key: &str) -> crate::error::Result<Option<MatchObject>> {
        let proposals = self
            .proposals
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire proposal read lock".to_string(),
            })?;
        Ok(proposals.get(key).cloned())
    }

    fn proposal_count(&self) -> crate::error::Result<usize> {
        let proposals = self
            .proposals
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire proposal read lock".to_string(),
            })?;
        Ok(proposals.len())
    }
}
