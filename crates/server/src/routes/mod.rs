use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod auth;
pub mod boards;
pub mod events;
pub mod health;
pub mod tasks;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router())
        .merge(boards::router())
        .merge(tasks::router())
        .merge(events::router());

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
