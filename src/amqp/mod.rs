//! AMQP integration for the orchestration service
//!
//! This module handles the broker connection and the publishing of proposal
//! announcements that the external evaluator consumes.

pub mod connection;
pub mod messages;
pub mod publisher;

// Re-export commonly used types
pub use connection::AmqpConnection;
pub use messages::*;
pub use publisher::{AmqpProposalQueue, InMemoryProposalQueue, ProposalQueue};
