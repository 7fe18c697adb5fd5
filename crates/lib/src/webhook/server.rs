//! Webhook HTTP server: health check, `/chat`, and the OpenAPI document.

use crate::completion::{preview, CompletionGateway};
use crate::config::Config;
use crate::llm::{CompletionBackend, OpenAiClient};
use crate::webhook::fault::{self, Fault};
use crate::webhook::openapi;
use crate::webhook::protocol::{self, parse_inbound};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use uuid::Uuid;

/// Shared, read-only state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<CompletionGateway>,
}

impl AppState {
    /// State with an explicit completion backend (used by tests and alternative backends).
    pub fn new(config: Config, backend: Arc<dyn CompletionBackend>) -> Self {
        let timeout = Duration::from_secs(config.completion.timeout_secs.max(1));
        let gateway = CompletionGateway::new(backend, config.completion.model.clone(), timeout);
        Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
        }
    }

    /// State backed by the OpenAI client described in `config.completion`.
    pub fn from_config(config: Config) -> Self {
        let client = OpenAiClient::new(
            Some(config.completion.base_url.clone()),
            config.completion.api_key.clone(),
        );
        if !client.has_api_key() {
            log::warn!("no completion API key configured; /chat will answer with the fallback message");
        }
        log::info!(
            "completion backend: {} at {} (model {})",
            client.name(),
            client.base_url(),
            config.completion.model
        );
        Self::new(config, Arc::new(client))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
}

/// Router with all routes. Panics inside handlers, wrong methods on `/chat`, and unknown
/// paths are all answered with the 200 fallback body.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/chat", post(chat).fallback(chat_method_not_allowed))
        .route("/openapi.json", get(openapi_json))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(fault::handle_panic))
        .with_state(state)
}

/// Run the server on config.server.bind:config.server.port until SIGINT/SIGTERM.
pub async fn run_server(config: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let app = create_router(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webhook relay listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;
    log::info!("webhook relay stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM; in-flight requests are drained by axum.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for liveness checks).
async fn health_http(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: format!("{} server is running", state.config.api.service_name),
    })
}

/// POST /chat — Watson Assistant webhook. Always answers 200.
async fn chat(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let request_id = Uuid::new_v4();
    let parsed = body
        .map_err(Fault::from)
        .and_then(|b| parse_inbound(&b).map_err(Fault::from));
    let msg = match parsed {
        Ok(msg) => msg,
        Err(fault) => return fault.into_fallback(request_id),
    };
    log::info!(
        "chat[{}]: received request from Watson Assistant: {}...",
        request_id,
        preview(&msg.text)
    );
    Json(state.gateway.respond(&msg, request_id).await).into_response()
}

/// Any method other than POST on /chat.
async fn chat_method_not_allowed(method: Method) -> Response {
    log::warn!("chat: method {} not allowed", method);
    fault::fallback_response(
        &format!("method {} not allowed on /chat", method),
        405,
        &protocol::Context::new(),
    )
}

async fn not_found(method: Method, uri: Uri) -> Response {
    log::warn!("no route for {} {}", method, uri);
    fault::fallback_response(
        &format!("no route for {} {}", method, uri.path()),
        404,
        &protocol::Context::new(),
    )
}

async fn openapi_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(openapi::document(&state.config.api))
}
