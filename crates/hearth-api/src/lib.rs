use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use hearth::Hearth;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod error;
pub mod form;
pub mod routes;

pub use config::ApiConfig;
pub use error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub hearth: Arc<Hearth>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(hearth: Hearth, config: ApiConfig) -> Self {
        Self {
            hearth: Arc::new(hearth),
            config: Arc::new(config),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::chat::chat,
        crate::routes::session::configure_session,
        crate::routes::catalog::list_models,
        crate::routes::catalog::list_prompts,
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            crate::routes::chat::ChatTurnForm,
            crate::routes::chat::ChatResponse,
            crate::routes::session::SessionForm,
            crate::routes::session::SessionResponse,
            crate::routes::catalog::CatalogEntryDto,
            crate::routes::catalog::ListCatalogResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "chat", description = "Session configuration and chat turns"),
        (name = "catalog", description = "Model and prompt files")
    )
)]
pub struct ApiDoc;

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors.allow_any_origin {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

/// Build API application
pub fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut app = Router::new().merge(routes::routes());
    if config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app.layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
