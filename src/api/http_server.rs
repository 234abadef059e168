// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::errors::ApiError;
use super::inpaint::inpaint_handler;
use super::ocr::obtain_text_handler;
use super::segment::calculate_boxes_handler;
use crate::version;
use crate::vision::inpaint::INPAINT_RADIUS;
use crate::vision::{Device, MaskGenerator, TextExtractor, VisionModelManager};

/// Largest accepted request body (two images plus form overhead)
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Model handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub mask_generator: Arc<dyn MaskGenerator>,
    pub text_extractor: Option<Arc<dyn TextExtractor>>,
    pub device: Device,
    pub inpaint_radius: u32,
}

impl AppState {
    pub fn new(
        mask_generator: Arc<dyn MaskGenerator>,
        text_extractor: Option<Arc<dyn TextExtractor>>,
        device: Device,
    ) -> Self {
        Self {
            mask_generator,
            text_extractor,
            device,
            inpaint_radius: INPAINT_RADIUS,
        }
    }

    pub fn from_manager(manager: &VisionModelManager) -> Self {
        Self::new(
            manager.mask_generator(),
            manager.text_extractor(),
            manager.device(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub device: Device,
    pub ocr_available: bool,
}

/// Router with the default body limit
pub fn create_app(state: Arc<AppState>) -> Router {
    create_router(state, DEFAULT_BODY_LIMIT)
}

pub fn create_router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/calculate-boxes", post(calculate_boxes_handler))
        .route("/obtainText", post(obtain_text_handler))
        .route("/inpaint", post(inpaint_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn start_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_router(Arc::new(state), config.body_limit);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Vision server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Vision server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION.to_string(),
        device: state.device,
        ocr_available: state.text_extractor.is_some(),
    })
}

/// Run CPU-bound model work off the async executor
pub(crate) async fn run_blocking<T, E, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::InternalError(format!("Worker task failed: {}", e)))?
        .map_err(Into::into)
}
