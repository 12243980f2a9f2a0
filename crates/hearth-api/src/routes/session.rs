use axum::{
    Json, Router,
    extract::{Request, State},
    routing::post,
};
use hearth::{EngineStatus, SamplingParameters};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::AppState;
use crate::error::ApiError;
use crate::form::FormData;

/// Form fields accepted by `POST /api/session`
#[derive(Debug, ToSchema)]
pub struct SessionForm {
    pub model: String,
    pub prompt: Option<String>,
    pub num_ctx: Option<u32>,
    pub temperature: Option<f32>,
    pub top_k: Option<usize>,
    pub n_gpu_layers: Option<u32>,
    pub vision: Option<String>,
}

/// Settings a client keeps and resubmits with every chat turn
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub model: String,
    pub prompt: Option<String>,
    pub num_ctx: u32,
    pub n_gpu_layers: u32,
    pub temperature: f32,
    pub top_k: usize,
    pub vision: bool,
    /// Starts empty; the client owns it from here on
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<hearth::Message>,
    #[schema(value_type = Object)]
    pub engine: EngineStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/session", post(configure_session))
}

/// Configure a chat session and load its engine
#[utoipa::path(
    post,
    path = "/api/session",
    request_body(content = SessionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Engine ready", body = SessionResponse),
        (status = 400, description = "Missing model or invalid field"),
        (status = 404, description = "Prompt file not found"),
        (status = 500, description = "Model load failed")
    ),
    tag = "chat"
)]
pub async fn configure_session(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<SessionResponse>, ApiError> {
    let form = FormData::from_request(req).await?;

    let model = form
        .text("model")
        .ok_or_else(|| ApiError::bad_request("Missing required field 'model'"))?;
    let prompt = form.text("prompt");
    let SamplingParameters { temperature, top_k } = form.sampling()?;
    let vision = form.flag("vision");
    let config = state.hearth.engine_config(
        model,
        form.number("num_ctx")?,
        form.number("n_gpu_layers")?,
        vision,
    );

    // fail early on a bad prompt name rather than on the first turn
    state.hearth.prompts().system_prompt(prompt.as_deref()).await?;
    let engine = state.hearth.configure(&config).await?;
    info!(model = %config.model, prompt = ?prompt, "Session configured");

    Ok(Json(SessionResponse {
        model: config.model,
        prompt,
        num_ctx: config.context_size,
        n_gpu_layers: config.gpu_layers,
        temperature,
        top_k,
        vision,
        history: Vec::new(),
        engine,
    }))
}
