//! Main application configuration
//!
//! This module defines the primary configuration structures for the pool-hall
//! orchestration service, including TOML file loading, environment variable
//! overrides and validation.

use crate::config::ignore::IgnoreListSettings;
use crate::pool::engine::{EngineSettings, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::proposal::pipeline::PipelineSettings;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub amqp: AmqpSettings,
    pub engine: EngineSettings,
    pub pipeline: PipelineSettings,
    pub ignore_lists: IgnoreListSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host to bind the orchestration API and metrics servers to
    pub host: String,
    /// Port for the orchestration API
    pub api_port: u16,
    /// Port for the metrics and health endpoints
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// AMQP connection and publishing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
    /// Topic exchange proposal announcements are published to
    pub exchange_name: String,
    /// Connection timeout in seconds
    pub connection_timeout_seconds: u64,
    /// Maximum retry attempts for failed connections and publishes
    pub max_retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pool-hall".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            api_port: 50503,
            metrics_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for AmqpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            exchange_name: "matchmaking.proposals".to_string(),
            connection_timeout_seconds: 30,
            max_retry_attempts: 5,
            retry_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("SERVICE_HOST") {
            config.service.host = host;
        }
        if let Ok(port) = env::var("API_PORT") {
            config.service.api_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid API_PORT value: {}", port))?;
        }
        if let Ok(port) = env::var("METRICS_PORT") {
            config.service.metrics_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid METRICS_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // AMQP settings
        if let Ok(host) = env::var("AMQP_HOST") {
            config.amqp.host = host;
        }
        if let Ok(port) = env::var("AMQP_PORT") {
            config.amqp.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_PORT value: {}", port))?;
        }
        if let Ok(username) = env::var("AMQP_USERNAME") {
            config.amqp.username = username;
        }
        if let Ok(password) = env::var("AMQP_PASSWORD") {
            config.amqp.password = password;
        }
        if let Ok(vhost) = env::var("AMQP_VHOST") {
            config.amqp.vhost = vhost;
        }
        if let Ok(exchange) = env::var("AMQP_EXCHANGE_NAME") {
            config.amqp.exchange_name = exchange;
        }
        if let Ok(timeout) = env::var("AMQP_CONNECTION_TIMEOUT_SECONDS") {
            config.amqp.connection_timeout_seconds = timeout.parse().map_err(|_| {
                anyhow!("Invalid AMQP_CONNECTION_TIMEOUT_SECONDS value: {}", timeout)
            })?;
        }
        if let Ok(retries) = env::var("AMQP_MAX_RETRY_ATTEMPTS") {
            config.amqp.max_retry_attempts = retries
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_MAX_RETRY_ATTEMPTS value: {}", retries))?;
        }
        if let Ok(delay) = env::var("AMQP_RETRY_DELAY_MS") {
            config.amqp.retry_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_RETRY_DELAY_MS value: {}", delay))?;
        }

        // Pool filter engine settings
        if let Ok(chunk_size) = env::var("POOL_CHUNK_SIZE") {
            config.engine.chunk_size = chunk_size
                .parse()
                .map_err(|_| anyhow!("Invalid POOL_CHUNK_SIZE value: {}", chunk_size))?;
        }
        if let Ok(capacity) = env::var("POOL_CHANNEL_CAPACITY") {
            config.engine.channel_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("Invalid POOL_CHANNEL_CAPACITY value: {}", capacity))?;
        }

        // Proposal pipeline settings
        if let Ok(retries) = env::var("PROPOSAL_MAX_PERSIST_RETRIES") {
            config.pipeline.max_persist_retries = retries
                .parse()
                .map_err(|_| anyhow!("Invalid PROPOSAL_MAX_PERSIST_RETRIES value: {}", retries))?;
        }
        if let Ok(delay) = env::var("PROPOSAL_RETRY_DELAY_MS") {
            config.pipeline.retry_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid PROPOSAL_RETRY_DELAY_MS value: {}", delay))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

impl AmqpSettings {
    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.api_port == 0 {
        return Err(anyhow!("API port cannot be 0"));
    }
    if config.service.metrics_port == 0 {
        return Err(anyhow!("Metrics port cannot be 0"));
    }
    if config.service.api_port == config.service.metrics_port {
        return Err(anyhow!("API and metrics ports must differ"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.amqp.connection_timeout_seconds == 0 {
        return Err(anyhow!("AMQP connection timeout must be greater than 0"));
    }

    // Validate AMQP settings
    if config.amqp.host.is_empty() {
        return Err(anyhow!("AMQP host cannot be empty"));
    }
    if config.amqp.exchange_name.is_empty() {
        return Err(anyhow!("AMQP exchange name cannot be empty"));
    }

    // Validate engine settings
    if config.engine.chunk_size < MIN_CHUNK_SIZE || config.engine.chunk_size > MAX_CHUNK_SIZE {
        return Err(anyhow!(
            "Pool chunk size {} outside supported range [{}, {}]",
            config.engine.chunk_size,
            MIN_CHUNK_SIZE,
            MAX_CHUNK_SIZE
        ));
    }
    if config.engine.channel_capacity == 0 {
        return Err(anyhow!("Pool channel capacity must be greater than 0"));
    }

    // Validate pipeline settings
    if config.pipeline.retry_delay_ms == 0 {
        return Err(anyhow!("Proposal retry delay must be greater than 0"));
    }

    // Validate ignore list windows
    if config.ignore_lists.lists.is_empty() {
        return Err(anyhow!("At least one ignore list must be configured"));
    }
    let mut names = std::collections::HashSet::new();
    for window in &config.ignore_lists.lists {
        if window.name.is_empty() {
            return Err(anyhow!("Ignore list names cannot be empty"));
        }
        if !names.insert(window.name.as_str()) {
            return Err(anyhow!("Duplicate ignore list name: {}", window.name));
        }
    }

    Ok(())
}
