//! Configuration management for the pool-hall service
//!
//! This module handles all configuration loading from TOML files and
//! environment variables, validation, and default values.

pub mod app;
pub mod ignore;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, ServiceSettings};
pub use ignore::{IgnoreListSettings, IgnoreListWindow};
