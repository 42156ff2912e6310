//! Pool Hall - Matchmaking function orchestration service
//!
//! This crate provides the backend surface that matchmaking function (MMF)
//! workers call to fetch match profiles, stream filtered player pools, and
//! submit match proposals for evaluator consideration.

pub mod amqp;
pub mod config;
pub mod error;
pub mod ignore;
pub mod metrics;
pub mod pool;
pub mod proposal;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
pub mod worker;

// Re-export commonly used types and traits
pub use error::{OrchestratorError, Result};
pub use types::*;

// Re-export key components
pub use pool::{drain_into_pool, PoolFilterEngine};
pub use proposal::ProposalPipeline;
pub use service::{MmfOrchestration, OrchestrationService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
