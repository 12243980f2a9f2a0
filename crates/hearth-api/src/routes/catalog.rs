use axum::{Json, Router, extract::State, routing::get};
use hearth::CatalogEntry;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;
use crate::error::ApiError;

/// API representation of a model or prompt file
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntryDto {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<String>,
}

impl From<CatalogEntry> for CatalogEntryDto {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            name: entry.name,
            size_bytes: entry.size_bytes,
            modified: entry.modified.map(|m| m.to_rfc3339()),
        }
    }
}

/// Response for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListCatalogResponse {
    pub items: Vec<CatalogEntryDto>,
    pub total: usize,
}

impl From<Vec<CatalogEntry>> for ListCatalogResponse {
    fn from(entries: Vec<CatalogEntry>) -> Self {
        let items: Vec<CatalogEntryDto> = entries.into_iter().map(CatalogEntryDto::from).collect();
        let total = items.len();
        Self { items, total }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(list_models))
        .route("/prompts", get(list_prompts))
}

/// List model files
#[utoipa::path(
    get,
    path = "/api/models",
    responses(
        (status = 200, description = "Model files", body = ListCatalogResponse)
    ),
    tag = "catalog"
)]
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<ListCatalogResponse>, ApiError> {
    let entries = state.hearth.models().list().await?;
    Ok(Json(entries.into()))
}

/// List system prompt files
#[utoipa::path(
    get,
    path = "/api/prompts",
    responses(
        (status = 200, description = "Prompt files", body = ListCatalogResponse)
    ),
    tag = "catalog"
)]
pub async fn list_prompts(
    State(state): State<AppState>,
) -> Result<Json<ListCatalogResponse>, ApiError> {
    let entries = state.hearth.prompts().list().await?;
    Ok(Json(entries.into()))
}
