//! MMF worker-side harness
//!
//! Each matchmaking attempt runs as a short-lived worker job. The harness
//! owns the common loop around the consumer-supplied matching logic: fetch
//! the profile, drain every pool stream, run the strategy, and write the
//! outcome back as a proposal or an error report.

pub mod harness;

// Re-export commonly used types
pub use harness::{MatchStrategy, MmfHarness, WorkerSettings};
