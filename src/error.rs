//! Error types for the orchestration service
//!
//! This module defines all error types using anyhow for consistent error
//! handling throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific orchestration scenarios
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Profile not found: {profile_id}")]
    ProfileNotFound { profile_id: String },

    #[error("Ignore list not found: {list}")]
    IgnoreListNotFound { list: String },

    #[error("Method not implemented: {method}")]
    Unimplemented { method: String },

    #[error("Invalid filter: {reason}")]
    InvalidFilter { reason: String },

    #[error("Invalid match object: {reason}")]
    InvalidMatchObject { reason: String },

    #[error("Pool stream interrupted before final chunk: {pool}")]
    StreamInterrupted { pool: String },

    #[error("State storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Evaluator queue unavailable: {message}")]
    QueueUnavailable { message: String },

    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl OrchestratorError {
    /// Stable wire code for this error, used by the HTTP surface and logs.
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::ProfileNotFound { .. }
            | OrchestratorError::IgnoreListNotFound { .. } => "not_found",
            OrchestratorError::Unimplemented { .. } => "unimplemented",
            OrchestratorError::InvalidFilter { .. }
            | OrchestratorError::InvalidMatchObject { .. } => "invalid_argument",
            OrchestratorError::StreamInterrupted { .. }
            | OrchestratorError::StorageUnavailable { .. }
            | OrchestratorError::QueueUnavailable { .. }
            | OrchestratorError::AmqpConnectionFailed { .. } => "unavailable",
            OrchestratorError::ConfigurationError { .. } => "failed_precondition",
            OrchestratorError::InternalError { .. } => "internal",
        }
    }
}

/// Wire code for any error surfaced by the service.
///
/// Errors that are not an `OrchestratorError` report as internal.
pub fn wire_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<OrchestratorError>()
        .map(OrchestratorError::code)
        .unwrap_or("internal")
}
