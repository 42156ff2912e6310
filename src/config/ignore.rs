//! Ignore list window configuration

use serde::{Deserialize, Serialize};

/// Name of the list holding players reserved by pending proposals
pub const PROPOSED_LIST: &str = "proposed";

/// Name of the list holding permanently excluded players
pub const BANNED_LIST: &str = "banned";

/// Time window over one named ignore list.
///
/// Windows follow the original sorted-set semantics: entries with append
/// timestamps in `[now - offset - duration, now - offset]` are visible.
/// A zero bound means unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreListWindow {
    pub name: String,
    /// Seconds to back off from now before the window starts
    #[serde(default)]
    pub offset_seconds: u64,
    /// Width of the window in seconds; 0 means everything up to the offset
    #[serde(default)]
    pub duration_seconds: u64,
}

impl IgnoreListWindow {
    pub fn new(name: impl Into<String>, offset_seconds: u64, duration_seconds: u64) -> Self {
        Self {
            name: name.into(),
            offset_seconds,
            duration_seconds,
        }
    }
}

/// The set of ignore lists the service consults when excluding players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreListSettings {
    pub lists: Vec<IgnoreListWindow>,
}

impl Default for IgnoreListSettings {
    fn default() -> Self {
        Self {
            lists: vec![
                // Players reserved by a pending proposal drop out of the
                // window once the evaluator has had 800 seconds to act.
                IgnoreListWindow::new(PROPOSED_LIST, 0, 800),
                IgnoreListWindow::new(BANNED_LIST, 0, 0),
            ],
        }
    }
}

impl IgnoreListSettings {
    /// Window configuration for a named list, if configured.
    pub fn find(&self, name: &str) -> Option<&IgnoreListWindow> {
        self.lists.iter().find(|w| w.name == name)
    }
}
