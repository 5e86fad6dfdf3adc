use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::webserver::state::AppState;

pub mod status;
pub mod ws;

/// Build the router: health check plus the WebSocket endpoint
pub fn create_router(state: Arc<AppState>) -> Router {
    let ws_path = state.config.websocket.path.clone();

    Router::new()
        .merge(status::routes())
        .merge(ws::routes(&ws_path))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
