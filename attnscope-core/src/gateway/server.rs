//! HTTP gateway server built on axum.

use super::events::{VisualizeRequest, VisualizeResponse};
use super::page::INDEX_HTML;
use crate::analyzer::{Analyzer, validate_input};
use crate::config::{RenderConfig, ServerConfig};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
///
/// The analyzer is the process-wide, read-only model handle; nothing a
/// request does is written back into it.
#[derive(Clone)]
pub struct GatewayState {
    analyzer: Arc<dyn Analyzer>,
    render: RenderConfig,
    max_body_bytes: usize,
    started_at: Instant,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("model_loaded", &self.analyzer.is_loaded())
            .field("render", &self.render)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl GatewayState {
    pub fn new(analyzer: Arc<dyn Analyzer>, render: RenderConfig, server: &ServerConfig) -> Self {
        Self {
            analyzer,
            render,
            max_body_bytes: server.max_body_bytes,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Build an axum Router with `/`, `/visualize`, and `/health` routes.
pub fn router(state: GatewayState) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/", get(index_handler))
        .route("/visualize", post(visualize_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint.
async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "model_loaded": state.analyzer.is_loaded(),
        "default_mode": state.analyzer.default_mode(),
        "uptime_secs": state.uptime_secs(),
    });
    Json(body)
}

/// Analyze the posted text and return tokens, weights, and predictions.
///
/// Analysis failures are reported as `{ success: false, error }` with status
/// 200; an unreadable request body yields 400 (413 when over the size limit).
async fn visualize_handler(
    State(state): State<GatewayState>,
    payload: Result<Json<VisualizeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected /visualize body");
            let status = match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            return (
                status,
                Json(VisualizeResponse::failure(rejection.body_text())),
            )
                .into_response();
        }
    };

    if let Err(err) = validate_input(&request.text) {
        return Json(VisualizeResponse::from_error(&err)).into_response();
    }

    let analyzer = Arc::clone(&state.analyzer);
    let mode = request.mode.unwrap_or_else(|| analyzer.default_mode());
    let text = request.text;
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&text, mode)).await;

    match outcome {
        Ok(Ok(result)) => Json(VisualizeResponse::from_result(result, &state.render)).into_response(),
        Ok(Err(err)) => {
            tracing::warn!(code = err.code(), error = %err, "Analysis failed");
            Json(VisualizeResponse::from_error(&err)).into_response()
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "Analysis task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VisualizeResponse::failure(format!(
                    "analysis task failed: {join_err}"
                ))),
            )
                .into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Start the gateway on the configured address.
///
/// Runs until Ctrl-C is received.
pub async fn run(state: GatewayState, server: &ServerConfig) -> Result<(), std::io::Error> {
    let app = router(state);
    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
