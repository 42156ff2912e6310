//! Ignore list storage for the orchestration service
//!
//! Ignore lists are named, versioned sets of player identifiers excluded
//! from matchmaking consideration. Entries carry the timestamp they were
//! appended at, and reads apply configured time windows.

pub mod store;

// Re-export commonly used types
pub use store::{union_ignored, IgnoreListStore, InMemoryIgnoreListStore, ListWindow};
