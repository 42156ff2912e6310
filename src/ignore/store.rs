//! Ignore list storage interface and in-memory implementation
//!
//! Lists are modeled as sets of player identifiers scored by the timestamp
//! each entry was appended at. Time-windowed reads serve the "proposed"
//! (recently reserved) versus permanent list split; pruning and promotion of
//! entries belongs to the external evaluator, this component only stores and
//! serves.

use crate::config::ignore::IgnoreListWindow;
use crate::error::OrchestratorError;
use crate::types::PlayerId;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Resolved time window over one list's entries.
///
/// Entries with append timestamps in `[now - offset - duration, now - offset]`
/// are visible; a `None` bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListWindow {
    pub offset: Option<Duration>,
    pub duration: Option<Duration>,
}

impl ListWindow {
    /// Window covering every entry on the list
    pub fn all() -> Self {
        Self::default()
    }

    /// Inclusive `[min, max]` timestamp bounds of this window as of `now`
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let max = match self.offset {
            Some(offset) => now - offset,
            None => now,
        };
        let min = match self.duration {
            Some(duration) => max - duration,
            None => DateTime::<Utc>::MIN_UTC,
        };
        (min, max)
    }
}

impl From<&IgnoreListWindow> for ListWindow {
    fn from(window: &IgnoreListWindow) -> Self {
        Self {
            offset: (window.offset_seconds > 0)
                .then(|| Duration::seconds(window.offset_seconds as i64)),
            duration: (window.duration_seconds > 0)
                .then(|| Duration::seconds(window.duration_seconds as i64)),
        }
    }
}

/// Trait for ignore list storage operations
pub trait IgnoreListStore: Send + Sync {
    /// Append player identifiers to a named list.
    ///
    /// Appends are idempotent: re-adding an already-listed player is a no-op
    /// that keeps the original timestamp. Returns the identifiers actually
    /// inserted, so callers can roll back exactly what they reserved.
    fn append(&self, list: &str, players: &[PlayerId]) -> crate::error::Result<Vec<PlayerId>>;

    /// Remove player identifiers from a named list; absent ids are ignored
    fn remove(&self, list: &str, players: &[PlayerId]) -> crate::error::Result<()>;

    /// Player identifiers on a list whose append timestamps fall inside the
    /// window, ordered oldest first
    fn list_players(
        &self,
        list: &str,
        window: ListWindow,
    ) -> crate::error::Result<Vec<PlayerId>>;

    /// Monotonic counter incremented on every effective mutation
    fn version(&self) -> u64;
}

/// Union of the configured list windows: the full exclusion set a pool scan
/// must consult.
pub fn union_ignored(
    store: &dyn IgnoreListStore,
    windows: &[IgnoreListWindow],
) -> crate::error::Result<HashSet<PlayerId>> {
    let mut ignored = HashSet::new();
    for window in windows {
        ignored.extend(store.list_players(&window.name, ListWindow::from(window))?);
    }
    Ok(ignored)
}

/// In-memory ignore list store implementation
#[derive(Debug, Default)]
pub struct InMemoryIgnoreListStore {
    lists: RwLock<HashMap<String, HashMap<PlayerId, DateTime<Utc>>>>,
    version: AtomicU64,
}

impl InMemoryIgnoreListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries on a list, ignoring windows (for tests/monitoring)
    pub fn list_len(&self, list: &str) -> crate::error::Result<usize> {
        let lists = self
            .lists
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire ignore list read lock".to_string(),
            })?;
        Ok(lists.get(list).map(|l| l.len()).unwrap_or(0))
    }
}

impl IgnoreListStore for InMemoryIgnoreListStore {
    fn append(&self, list: &str, players: &[PlayerId]) -> crate::error::Result<Vec<PlayerId>> {
        if players.is_empty() {
            return Ok(Vec::new());
        }

        let mut lists = self
            .lists
            .write()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire ignore list write lock".to_string(),
            })?;
        let entries = lists.entry(list.to_string()).or_default();

        let now = Utc::now();
        let mut newly_added = Vec::new();
        for player in players {
            if !entries.contains_key(player) {
                entries.insert(player.clone(), now);
                newly_added.push(player.clone());
            }
        }

        if !newly_added.is_empty() {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(newly_added)
    }

    fn remove(&self, list: &str, players: &[PlayerId]) -> crate::error::Result<()> {
        let mut lists = self
            .lists
            .write()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire ignore list write lock".to_string(),
            })?;

        if let Some(entries) = lists.get_mut(list) {
            let mut changed = false;
            for player in players {
                changed |= entries.remove(player).is_some();
            }
            if changed {
                self.version.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    fn list_players(
        &self,
        list: &str,
        window: ListWindow,
    ) -> crate::error::Result<Vec<PlayerId>> {
        let lists = self
            .lists
            .read()
            .map_err(|_| OrchestratorError::InternalError {
                message: "Failed to acquire ignore list read lock".to_string(),
            })?;

        let entries = match lists.get(list) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        let (min, max) = window.bounds(Utc::now());
        let mut visible: Vec<(&PlayerId, &DateTime<Utc>)> = entries
            .iter()
            .filter(|(_, ts)| **ts >= min && **ts <= max)
            .collect();
        visible.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));

        Ok(visible.into_iter().map(|(id, _)| id.clone()).collect())
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}
