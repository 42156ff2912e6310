//! Proposal intake pipeline
//!
//! Accepts completed match objects from MMF runs, reserves their players on
//! the ignore list, persists them durably, and hands their keys to the
//! evaluator queue.

pub mod pipeline;

// Re-export commonly used types
pub use pipeline::{PipelineSettings, ProposalPipeline};
