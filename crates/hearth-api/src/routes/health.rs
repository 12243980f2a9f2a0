use crate::AppState;
use axum::{Json, Router, extract::State, routing::get};
use hearth::EngineStatus;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    /// Engine slot: `unloaded`, `loaded` or `failed`; absent while busy
    #[schema(value_type = Option<Object>)]
    pub engine: Option<EngineStatus>,
    /// A model load or chat turn is in progress
    pub busy: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.hearth.engines().try_status();
    let busy = engine.is_none();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "hearth-api".to_string(),
        engine,
        busy,
    })
}
