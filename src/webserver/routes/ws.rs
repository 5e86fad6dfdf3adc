/// WebSocket upgrade endpoint
///
/// Admission happens before the handshake: when every slot is taken the
/// request is answered with 503 and never upgraded.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    webserver::{state::AppState, ws::connection::handle_connection},
};

pub fn routes(path: &str) -> Router<Arc<AppState>> {
    Router::new().route(path, get(ws_handler))
}

/// Admit, then upgrade to a chat session
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(slot) = state.slots.try_acquire() else {
        logger::warning(
            LogTag::Webserver,
            &format!(
                "Rejected WebSocket from {}: connection limit reached ({})",
                peer,
                state.slots.max()
            ),
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "WebSocket connection from {} admitted (active_ws={})",
                peer,
                state.slots.in_use()
            ),
        );
    }

    let max_frame = state.config.websocket.max_frame_bytes;
    ws.max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_failed_upgrade(move |e| {
            logger::warning(
                LogTag::Webserver,
                &format!("WebSocket upgrade from {} failed: {}", peer, e),
            );
        })
        .on_upgrade(move |socket| handle_connection(socket, state, peer.to_string(), slot))
}
