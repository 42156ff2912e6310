//! Player pool filtering and streaming
//!
//! This module evaluates pool filter specifications against the candidate
//! player set, excludes ignored players, and streams the matching roster in
//! bounded-size chunks with cumulative statistics.

pub mod drain;
pub mod engine;
pub mod filter;

// Re-export commonly used types
pub use drain::drain_into_pool;
pub use engine::{EngineSettings, PoolFilterEngine, PoolStream};
