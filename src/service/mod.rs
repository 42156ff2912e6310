//! Service layer for the pool-hall orchestration service
//!
//! This module contains the orchestration protocol surface, the HTTP wire
//! binding, the main application state and health checks.

pub mod api;
pub mod app;
pub mod health;
pub mod http;

pub use api::{MmfOrchestration, OrchestrationService};
pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use http::{ApiServer, ApiServerConfig};
