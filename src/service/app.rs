//! Main application state and service coordination
//!
//! This module contains the production AppState that constructs all service
//! components, connects to the AMQP broker, and runs the API, metrics and
//! background tasks.

use crate::amqp::connection::AmqpConnection;
use crate::amqp::publisher::{AmqpProposalQueue, PublisherConfig};
use crate::config::AppConfig;
use crate::ignore::store::{IgnoreListStore, InMemoryIgnoreListStore, ListWindow};
use crate::metrics::health::{HealthServer, HealthServerConfig};
use crate::metrics::{MetricsCollector, MetricsService};
use crate::pool::engine::PoolFilterEngine;
use crate::proposal::pipeline::ProposalPipeline;
use crate::service::api::{MmfOrchestration, OrchestrationService};
use crate::service::http::{ApiServer, ApiServerConfig};
use crate::store::players::{InMemoryPlayerRepository, PlayerRepository};
use crate::store::profiles::{InMemoryProfileStore, ProfileStore};
use crate::store::proposals::{InMemoryProposalStore, ProposalStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("AMQP connection error: {message}")]
    AmqpConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Orchestration protocol implementation
    orchestration: Arc<OrchestrationService>,

    /// State storage components
    players: Arc<dyn PlayerRepository>,
    profiles: Arc<dyn ProfileStore>,
    proposals: Arc<dyn ProposalStore>,
    ignore: Arc<dyn IgnoreListStore>,

    /// AMQP connection feeding the evaluator queue
    _amqp_connection: Arc<AmqpConnection>,

    /// Shared metrics collector
    metrics_collector: Arc<MetricsCollector>,

    /// API server for the orchestration protocol
    api_server: Arc<ApiServer>,

    /// Metrics service, constructed at start time
    metrics_service: Mutex<Option<Arc<MetricsService>>>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing pool-hall orchestration service");
        info!(
            "Configuration: service={}, amqp={}:{}",
            config.service.name, config.amqp.host, config.amqp.port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        // AMQP connection and the evaluator queue publisher
        let amqp_connection = Arc::new(
            AmqpConnection::new(config.amqp.clone())
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: e.to_string(),
                })?,
        );
        let channel =
            amqp_connection
                .open_channel()
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: e.to_string(),
                })?;
        let queue = Arc::new(
            AmqpProposalQueue::new(
                channel,
                PublisherConfig {
                    exchange_name: config.amqp.exchange_name.clone(),
                    max_retries: config.amqp.max_retry_attempts,
                    retry_delay_ms: config.amqp.retry_delay_ms,
                },
            )
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: e.to_string(),
            })?,
        );

        // State storage
        let players: Arc<dyn PlayerRepository> = Arc::new(InMemoryPlayerRepository::new());
        let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
        let proposals: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
        let ignore: Arc<dyn IgnoreListStore> = Arc::new(InMemoryIgnoreListStore::new());

        // Core components
        let engine = PoolFilterEngine::with_metrics(
            players.clone(),
            ignore.clone(),
            config.ignore_lists.clone(),
            config.engine,
            metrics_collector.clone(),
        );
        let pipeline = ProposalPipeline::with_metrics(
            ignore.clone(),
            proposals.clone(),
            queue,
            config.pipeline,
            metrics_collector.clone(),
        );
        let orchestration = Arc::new(OrchestrationService::with_metrics(
            profiles.clone(),
            engine,
            pipeline,
            ignore.clone(),
            config.ignore_lists.clone(),
            metrics_collector.clone(),
        ));

        let api_server = Arc::new(ApiServer::new(
            ApiServerConfig {
                host: config.service.host.clone(),
                port: config.service.api_port,
            },
            orchestration.clone() as Arc<dyn MmfOrchestration>,
        ));

        Ok(Self {
            config,
            orchestration,
            players,
            profiles,
            proposals,
            ignore,
            _amqp_connection: amqp_connection,
            metrics_collector,
            api_server,
            metrics_service: Mutex::new(None),
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start all servers and background tasks
    pub async fn start(self: Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting pool-hall orchestration service");

        *self.is_running.write().await = true;

        let mut tasks = self.background_tasks.lock().await;

        // Metrics and health server
        let health_server = Arc::new(
            HealthServer::new(
                HealthServerConfig {
                    host: self.config.service.host.clone(),
                    port: self.config.service.metrics_port,
                },
                self.metrics_collector.clone(),
            )
            .with_app_state(self.clone()),
        );
        let metrics_service = Arc::new(MetricsService::new(
            self.metrics_collector.clone(),
            health_server,
        ));
        *self.metrics_service.lock().await = Some(metrics_service.clone());

        tasks.push(tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service terminated: {}", e);
            }
        }));

        // Orchestration API server
        let api_server = self.api_server.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = api_server.start().await {
                error!("API server terminated: {}", e);
            }
        }));

        // Gauge refresher
        tasks.push(tokio::spawn(Self::gauge_refresh_task(self.clone())));

        info!("Pool-hall orchestration service started");
        Ok(())
    }

    /// Periodically refresh uptime and ignore-list gauges
    async fn gauge_refresh_task(app_state: Arc<Self>) {
        let started = std::time::Instant::now();
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        while app_state.is_running().await {
            interval.tick().await;

            app_state
                .metrics_collector
                .service()
                .uptime_seconds
                .set(started.elapsed().as_secs() as i64);

            for window in &app_state.config.ignore_lists.lists {
                match app_state
                    .ignore
                    .list_players(&window.name, ListWindow::all())
                {
                    Ok(entries) => app_state
                        .metrics_collector
                        .set_ignored_players(&window.name, entries.len()),
                    Err(e) => warn!("Failed to read ignore list '{}': {}", window.name, e),
                }
            }
        }
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of pool-hall service");

        *self.is_running.write().await = false;

        if let Err(e) = self.api_server.stop().await {
            warn!("Failed to stop API server: {}", e);
        }

        if let Some(metrics_service) = self.metrics_service.lock().await.take() {
            if let Err(e) = metrics_service.stop().await {
                warn!("Failed to stop metrics service: {}", e);
            }
        }

        // Give the servers a moment to drain, then drop remaining tasks.
        tokio::time::sleep(Duration::from_millis(100)).await;
        for task in self.background_tasks.lock().await.drain(..) {
            task.abort();
        }

        info!("Pool-hall orchestration service stopped");
        Ok(())
    }

    /// Whether the service is accepting work
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Orchestration protocol implementation
    pub fn orchestration(&self) -> Arc<OrchestrationService> {
        self.orchestration.clone()
    }

    /// Candidate player repository
    pub fn players(&self) -> Arc<dyn PlayerRepository> {
        self.players.clone()
    }

    /// Profile store
    pub fn profiles(&self) -> Arc<dyn ProfileStore> {
        self.profiles.clone()
    }

    /// Proposal store
    pub fn proposals(&self) -> Arc<dyn ProposalStore> {
        self.proposals.clone()
    }

    /// Ignore list store
    pub fn ignore(&self) -> Arc<dyn IgnoreListStore> {
        self.ignore.clone()
    }

    /// Distinct players currently on any configured ignore list
    pub fn ignored_player_count(&self) -> crate::error::Result<usize> {
        let ignored = crate::ignore::store::union_ignored(
            self.ignore.as_ref(),
            &self.config.ignore_lists.lists,
        )?;
        Ok(ignored.len())
    }
}
