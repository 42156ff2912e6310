//! HTTP wire surface for the orchestration protocol
//!
//! Request/response calls map to JSON endpoints; `GetPlayerPool` streams its
//! chunks as newline-delimited JSON frames so a worker can start merging
//! results before the scan finishes. A mid-stream failure is delivered as a
//! typed error frame rather than a silently truncated body.

use crate::error::wire_code;
use crate::service::api::MmfOrchestration;
use crate::types::{MatchObject, PlayerPool, PoolChunk, Roster};
use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50503,
        }
    }
}

/// One newline-delimited frame of a pool-scan response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Chunk(PoolChunk),
    Error { code: String, message: String },
}

/// HTTP server exposing the orchestration protocol
pub struct ApiServer {
    config: ApiServerConfig,
    api: Arc<dyn MmfOrchestration>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, api: Arc<dyn MmfOrchestration>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            api,
            shutdown_tx,
        }
    }

    /// Start serving until a shutdown signal arrives
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid API server address")?;

        let app = self.create_router();
        let listener = TcpListener::bind(addr).await?;

        info!("Orchestration API listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API server shutdown signal received");
            })
            .await?;

        info!("API server stopped");
        Ok(())
    }

    /// Create the Axum router with all protocol endpoints
    pub fn create_router(&self) -> Router {
        Router::new()
            .route("/v1/profiles/{id}", get(get_profile_handler))
            .route("/v1/pools/scan", post(scan_pool_handler))
            .route("/v1/proposals", post(create_proposal_handler))
            .route("/v1/ignored", get(all_ignored_handler))
            .route("/v1/ignored/{list}", get(list_ignored_handler))
            .route("/v1/ignored/{list}/release", post(release_ignored_handler))
            .with_state(self.api.clone())
    }

    /// Stop the API server
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping API server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to API server: {}", e);
        }

        Ok(())
    }
}

/// Map a service error to an HTTP error response
fn error_response(err: anyhow::Error) -> Response {
    let code = wire_code(&err);
    let status = match code {
        "not_found" => StatusCode::NOT_FOUND,
        "invalid_argument" => StatusCode::BAD_REQUEST,
        "unimplemented" => StatusCode::NOT_IMPLEMENTED,
        "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        "failed_precondition" => StatusCode::PRECONDITION_FAILED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    debug!("Request failed - code: {}, error: {}", code, err);
    (
        status,
        Json(serde_json::json!({
            "code": code,
            "error": err.to_string(),
        })),
    )
        .into_response()
}

async fn get_profile_handler(
    State(api): State<Arc<dyn MmfOrchestration>>,
    Path(id): Path<String>,
) -> Response {
    match api.get_profile(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(err) => error_response(err),
    }
}

async fn scan_pool_handler(
    State(api): State<Arc<dyn MmfOrchestration>>,
    Json(pool): Json<PlayerPool>,
) -> Response {
    match api.get_player_pool(pool).await {
        Ok(stream) => {
            let frames = stream.map(|item| -> std::result::Result<Bytes, Infallible> {
                let frame = match item {
                    Ok(chunk) => StreamFrame::Chunk(chunk),
                    Err(err) => StreamFrame::Error {
                        code: wire_code(&err).to_string(),
                        message: err.to_string(),
                    },
                };
                let mut line = serde_json::to_vec(&frame).unwrap_or_else(|_| {
                    br#"{"type":"error","code":"internal","message":"frame encoding failed"}"#
                        .to_vec()
                });
                line.push(b'\n');
                Ok(Bytes::from(line))
            });

            match Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/x-ndjson")
                .body(Body::from_stream(frames))
            {
                Ok(response) => response,
                Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        Err(err) => error_response(err),
    }
}

async fn create_proposal_handler(
    State(api): State<Arc<dyn MmfOrchestration>>,
    Json(proposal): Json<MatchObject>,
) -> Response {
    match api.create_proposal(proposal).await {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => error_response(err),
    }
}

async fn all_ignored_handler(State(api): State<Arc<dyn MmfOrchestration>>) -> Response {
    match api.get_all_ignored_players().await {
        Ok(roster) => Json(roster).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_ignored_handler(
    State(api): State<Arc<dyn MmfOrchestration>>,
    Path(list): Path<String>,
) -> Response {
    match api.list_ignored_players(&list).await {
        Ok(roster) => Json(roster).into_response(),
        Err(err) => error_response(err),
    }
}

async fn release_ignored_handler(
    State(api): State<Arc<dyn MmfOrchestration>>,
    Path(list): Path<String>,
    Json(players): Json<Roster>,
) -> Response {
    match api.release_ignored_players(&list, players).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}
