//! HTTP route handlers for the talk API.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::Instrument;

use crate::talk::core::errors::TalkResult;
use crate::talk::core::model::{EpisodeInput, EpisodeResult};
use crate::talk::correction::LengthCorrector;
use crate::talk::schema::{SCHEMA_NAME, SCHEMA_VERSION};

use super::state::AppState;

/// Public service name.
pub const SERVICE_NAME: &str = "Episode Talk Maker API";

/// Create the API router with all routes.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/generate", post(generate))
        .with_state(state)
}

/// Static service metadata.
async fn service_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.model,
        "schema": { "name": SCHEMA_NAME, "version": SCHEMA_VERSION },
        "started_at": state.started_at.to_rfc3339(),
        "endpoints": ["/", "/health", "/generate"]
    }))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always true while the process serves requests.
    pub ok: bool,
    /// Whether a completion credential is configured.
    pub openai_key_configured: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        openai_key_configured: state.key_configured(),
    })
}

/// Generate a talk package for one episode.
async fn generate(
    State(state): State<Arc<AppState>>,
    Json(input): Json<EpisodeInput>,
) -> TalkResult<Json<EpisodeResult>> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("generate", %request_id, duration_sec = input.duration_sec);

    async move {
        let outcome = run_generation(&state, &input).await;
        if let Err(err) = &outcome {
            tracing::error!("Generation failed: {err:?}");
        }
        outcome.map(Json)
    }
    .instrument(span)
    .await
}

async fn run_generation(state: &AppState, input: &EpisodeInput) -> TalkResult<EpisodeResult> {
    let backend = state.backend()?;
    input.validate()?;

    let correction = LengthCorrector::new(backend, &state.schema, &state.config.prompt)
        .run(input)
        .await?;

    tracing::info!(
        "Generated {} lines / {} chars (budget {}) in {} attempt(s), using the {:?} draft",
        correction.result.script.len(),
        correction.total_chars,
        correction.budget,
        correction.attempts,
        correction.source
    );

    Ok(correction.result)
}
