use axum::{
    Json, Router,
    extract::{Request, State},
    routing::post,
};
use hearth::{ChatError, ChatTurnRequest, Message, parse_history};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::AppState;
use crate::error::ApiError;
use crate::form::FormData;

/// Form fields accepted by `POST /api/chat`
#[derive(Debug, ToSchema)]
pub struct ChatTurnForm {
    /// Model file name; omit to keep using the loaded engine
    pub model: Option<String>,
    /// Prompt file name for the system message
    pub prompt: Option<String>,
    pub num_ctx: Option<u32>,
    /// Defaults to 0.8
    pub temperature: Option<f32>,
    /// Defaults to 40
    pub top_k: Option<usize>,
    pub n_gpu_layers: Option<u32>,
    /// "true" (any case) forwards the image to the engine
    pub vision: Option<String>,
    pub user_input: Option<String>,
    /// JSON array of prior messages, defaults to `[]`
    pub history: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// Updated conversation, without the system message
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<Message>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

/// Turn a decoded form into a chat turn
pub fn turn_request(state: &AppState, mut form: FormData) -> Result<ChatTurnRequest, ApiError> {
    let history = parse_history(form.raw("history").unwrap_or("[]")).map_err(ChatError::from)?;
    let vision = form.flag("vision");

    let mut request = ChatTurnRequest::new(history)
        .with_vision(vision)
        .with_sampling(form.sampling()?);

    if let Some(model) = form.text("model") {
        let config = state.hearth.engine_config(
            model,
            form.number("num_ctx")?,
            form.number("n_gpu_layers")?,
            vision,
        );
        request = request.with_engine(config);
    }
    if let Some(prompt) = form.text("prompt") {
        request = request.with_prompt(prompt);
    }
    if let Some(input) = form.raw("user_input") {
        request = request.with_user_input(input);
    }
    if let Some(image) = form.take_image() {
        request = request.with_image(image);
    }

    Ok(request)
}

/// Run one chat turn
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body(content = ChatTurnForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated history", body = ChatResponse),
        (status = 400, description = "Malformed history, empty turn or invalid field"),
        (status = 404, description = "Prompt file not found"),
        (status = 409, description = "No engine loaded"),
        (status = 500, description = "Model load or inference failed")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<ChatResponse>, ApiError> {
    let form = FormData::from_request(req).await?;
    let request = turn_request(&state, form)?;
    debug!(
        history = request.history.len(),
        has_engine = request.engine.is_some(),
        has_image = request.image.is_some(),
        "Chat request decoded"
    );

    let history = state.hearth.run_turn(request).await?;
    Ok(Json(ChatResponse { history }))
}
