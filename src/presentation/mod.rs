// Presentation layer - HTTP routes over the embed surface
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_embed_url, embed_dashboard, get_board, health_check, list_boards, list_dashboards,
    save_board, stream_dashboard,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboards", get(list_dashboards))
        .route("/dashboards/:id/embed-url", post(create_embed_url))
        .route("/dashboards/:id/stream", get(stream_dashboard))
        .route("/embed/:embed_type/dashboard/:id", get(embed_dashboard))
        .route("/boards", get(list_boards))
        .route("/boards/:name", get(get_board).put(save_board))
        .with_state(state)
}
