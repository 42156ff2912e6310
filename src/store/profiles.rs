//! Profile storage interface and in-memory implementation
//!
//! Profiles are written by the frontend/ingestion side; the orchestration
//! service only ever reads them on behalf of MMF workers.

use crate::error::OrchestratorError;
use crate::types::Profile;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for profile storage operations
pub trait ProfileStore: Send + Sync {
    /// Store or replace a profile under its identifier
    fn put_profile(&self, profile: Profile) -> crate::error::Result<()>;

    /// Fetch a profile by identifier.
    ///
    /// Returns `None` when no profile exists at the key; the profile is never
    /// partially populated.
    fn get_profile(&self, id: &str) -> crate::error::Result<Option<Profile>>;
}

/// In-memory profile store implementation
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn put_profile(&self, profile: Profile) -> crate::error::Result<()> {
        if profile.id.is_empty() {
            return Err(OrchestratorError::InvalidMatchObject {
                reason: "profile id cannot be empty".to_string(),
            }
            .into());
        }

        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire profile write lock".to_string(),
            })?;
        profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn get_profile(&self, id: &str) -> crate::error::Result<Option<Profile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire profile read lock".to_string(),
            })?;
        Ok(profiles.get(id).cloned())
    }
}
