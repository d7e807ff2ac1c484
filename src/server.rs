//! JSON HTTP server.
//!
//! Serves the pipeline to presentation layers that do their own rendering.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | `{"query"}` → `{"text", "sources": [{"topic", "snippet"}]}` |
//! | `GET`  | `/health` | Status, version, and indexed unit count |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Lütfen kısa bir durum cümlesi yaz." } }
//! ```
//!
//! Error codes: `bad_request` (400, blank query or a body that is not
//! `{"query": string}` JSON), `generation_failed` (502), `internal` (500). A failed query never takes the server down.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! on another origin can call `/ask`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

use focusia_core::models::AnswerResponse;
use focusia_core::pipeline::Pipeline;
use focusia_core::FocusiaError;

use crate::ask::BLANK_QUERY_MESSAGE;
use crate::config::Config;
use crate::runtime::build_pipeline;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Number of indexed units, reported by `/health`.
    pub units: usize,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Build the pipeline and serve on `[server].bind` until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let runtime = build_pipeline(config).await?;
    let state = AppState {
        pipeline: runtime.pipeline,
        units: runtime.units,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        units = state.units,
        index = %runtime.index_origin,
        "server listening"
    );
    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

/// Generation failures are the upstream model's fault: 502. Anything else
/// is ours: 500.
fn classify_pipeline_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<FocusiaError>() {
        Some(e) if e.is_per_query() => AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "generation_failed",
            message: err.to_string(),
        },
        _ => AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: format!("{:#}", err),
        },
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    units: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        units: state.units,
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    query: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(bad_request(BLANK_QUERY_MESSAGE));
    }

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("ask", %request_id);
    async move {
        let result = state.pipeline.invoke(query).await.map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "query failed");
            classify_pipeline_error(e)
        })?;
        tracing::info!(sources = result.sources.len(), "query answered");
        Ok(Json(result.to_response()))
    }
    .instrument(span)
    .await
}
