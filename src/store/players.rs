//! Candidate player storage interface and in-memory implementation
//!
//! Players enter through the frontend/ingestion side with their indexed
//! attributes; pool scans read a point-in-time snapshot so a concurrent
//! update can never produce a torn view of a single player.

use crate::error::OrchestratorError;
use crate::types::{Player, PlayerId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for candidate player storage operations
pub trait PlayerRepository: Send + Sync {
    /// Store or replace a player and their indexed attributes
    fn upsert_player(&self, player: Player) -> crate::error::Result<()>;

    /// Remove a player; returns whether the player existed
    fn remove_player(&self, id: &PlayerId) -> crate::error::Result<bool>;

    /// Fetch a single player
    fn get_player(&self, id: &PlayerId) -> crate::error::Result<Option<Player>>;

    /// Point-in-time copy of all candidates, in stable id order.
    ///
    /// Stable ordering keeps repeated scans chunking identically.
    fn snapshot(&self) -> crate::error::Result<Vec<Player>>;

    /// Number of stored candidates
    fn player_count(&self) -> crate::error::Result<usize>;
}

/// In-memory player repository implementation
#[derive(Debug, Default)]
pub struct InMemoryPlayerRepository {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerRepository for InMemoryPlayerRepository {
    fn upsert_player(&self, player: Player) -> crate::error::Result<()> {
        if player.id.is_empty() {
            return Err(OrchestratorError::InvalidMatchObject {
                reason: "player id cannot be empty".to_string(),
            }
            .into());
        }

        let mut players = self
            .players
            .write()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire player write lock".to_string(),
            })?;
        players.insert(player.id.clone(), player);
        Ok(())
    }

    fn remove_player(&self, id: &PlayerId) -> crate::error::Result<bool> {
        let mut players = self
            .players
            .write()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire player write lock".to_string(),
            })?;
        Ok(players.remove(id).is_some())
    }

    fn get_player(&self, id: &PlayerId) -> crate::error::Result<Option<Player>> {
        let players = self
            .players
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire player read lock".to_string(),
            })?;
        Ok(players.get(id).cloned())
    }

    fn snapshot(&self) -> crate::error::Result<Vec<Player>> {
        let players = self
            .players
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire player read lock".to_string(),
            })?;
        let mut snapshot: Vec<Player> = players.values().cloned().collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(snapshot)
    }

    fn player_count(&self) -> crate::error::Result<usize> {
        let players = self
            .players
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire player read lock".to_string(),
            })?;
        Ok(players.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;

    fn player(id: &str, level: i64) -> Player {
        let mut p = Player::with_id(id);
        p.attributes
            .insert("level".to_string(), AttributeValue::Number(level));
        p
    }

    #[test]
    fn test_upsert_and_get() {
        let repo = InMemoryPlayerRepository::new();
        repo.upsert_player(player("p1", 50)).unwrap();

        let fetched = repo.get_player(&"p1".to_string()).unwrap().unwrap();
        assert_eq!(
            fetched.attributes.get("level"),
            Some(&AttributeValue::Number(50))
        );

        // Upsert replaces the previous attribute set
        repo.upsert_player(player("p1", 60)).unwrap();
        assert_eq!(repo.player_count().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_is_sorted_by_id() {
        let repo = InMemoryPlayerRepository::new();
        repo.upsert_player(player("p3", 1)).unwrap();
        repo.upsert_player(player("p1", 2)).unwrap();
        repo.upsert_player(player("p2", 3)).unwrap();

        let ids: Vec<String> = repo
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_remove_player() {
        let repo = InMemoryPlayerRepository::new();
        repo.upsert_player(player("p1", 50)).unwrap();

        assert!(repo.remove_player(&"p1".to_string()).unwrap());
        assert!(!repo.remove_player(&"p1".to_string()).unwrap());
        assert_eq!(repo.player_count().unwrap(), 0);
    }
}
