//! HTTP server exposing the batch processing operation.
//!
//! One endpoint does the work: `POST /clip` accepts a list of links plus
//! optional per-request overrides for return mode, strategy, and disk
//! persistence. A single-link markdown request answers with raw Markdown;
//! any multi-link request answers with a JSON array regardless of the
//! requested mode. The pipeline sits behind a mutex: one batch at a time.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use clipvault_core::pipeline::{BatchOptions, BatchOutput, Pipeline};
use clipvault_core::{Config, RenderStrategy, ReturnMode};

/// Upper bound on one request, overridable via `CLIPVAULT_REQUEST_TIMEOUT`
/// (seconds). A browser-strategy batch can spend the per-attempt timeout
/// twice per link, so batches of a few dozen links need a higher cap; the
/// pipeline keeps running (and holds the lock) after the response is cut.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

fn parse_request_timeout(raw: Option<String>) -> Duration {
    let secs = raw
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

struct AppState {
    config: Config,
    pipeline: Mutex<Pipeline>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClipRequest {
    links: Vec<String>,
    #[serde(default, alias = "returnFormat")]
    return_format: Option<ReturnMode>,
    #[serde(default)]
    strategy: Option<RenderStrategy>,
    #[serde(default, alias = "saveToDisk")]
    save: Option<bool>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

async fn clip(State(state): State<Arc<AppState>>, Json(request): Json<ClipRequest>) -> Response {
    if request.links.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "At least one link is required");
    }

    let mut options = BatchOptions::from_config(&state.config);
    if let Some(mode) = request.return_format {
        options.mode = mode;
    }
    if let Some(strategy) = request.strategy {
        options.strategy = strategy;
    }
    if let Some(save) = request.save {
        options.save = save;
    }
    // More than one link always gets the JSON array shape.
    let single_markdown = request.links.len() == 1 && options.mode == ReturnMode::Markdown;

    let mut pipeline = state.pipeline.lock().await;
    let result = match pipeline.process_batch(&request.links, &options, |_, _| {}).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Batch failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };
    drop(pipeline);

    match result.output {
        BatchOutput::Markdown(docs) if single_markdown => {
            let body = docs.into_iter().next().unwrap_or_default();
            ([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], body).into_response()
        }
        BatchOutput::Markdown(docs) => Json(docs).into_response(),
        BatchOutput::Structured(docs) => Json(docs).into_response(),
    }
}

fn app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/clip", post(clip))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipvault=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let pipeline = match Pipeline::new(config.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize pipeline");
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState { config, pipeline: Mutex::new(pipeline) });

    let addr: SocketAddr = std::env::var("CLIPVAULT_ADDR")
        .ok()
        .and_then(|a| a.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8089)));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    let request_timeout = parse_request_timeout(std::env::var("CLIPVAULT_REQUEST_TIMEOUT").ok());

    tracing::info!(%addr, "clipvault-server listening");
    if let Err(e) = axum::serve(listener, app(state, request_timeout)).await {
        tracing::error!(error = %e, "Server exited with error");
    }
}
