use crate::AppState;
use axum::Router;

pub mod catalog;
pub mod chat;
pub mod health;
pub mod session;

/// Merge all routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest(
            "/api",
            Router::new()
                .merge(chat::routes())
                .merge(session::routes())
                .merge(catalog::routes()),
        )
}
