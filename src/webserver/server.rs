/// Axum webserver implementation
///
/// Main server lifecycle management including startup, shutdown, and graceful termination
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::{
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid bind address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("{0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Start the webserver on the configured address
///
/// This function blocks until the server is shut down
pub async fn start_server(state: Arc<AppState>) -> Result<(), ServerError> {
    let bind = state.config.server.bind_address();

    let addr: SocketAddr = bind.parse().map_err(|e: std::net::AddrParseError| {
        ServerError::InvalidAddress {
            addr: bind.clone(),
            reason: e.to_string(),
        }
    })?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        // Provide helpful error message for common cases
        match e.kind() {
            std::io::ErrorKind::AddrInUse => ServerError::Bind(format!(
                "Failed to bind to {}: Address already in use\n\
                 \n\
                 Another process (possibly another chat server) is listening on port {}.\n\
                 Stop it or pick a different port with --port or PORT.",
                addr,
                addr.port()
            )),
            std::io::ErrorKind::PermissionDenied => ServerError::Bind(format!(
                "Failed to bind to {}: Permission denied\n\
                 \n\
                 Port {} requires elevated privileges on this system.\n\
                 Consider using a port above 1024 or running with appropriate permissions.",
                addr,
                addr.port()
            )),
            _ => ServerError::Bind(format!("Failed to bind to {}: {}", addr, e)),
        }
    })?;

    logger::info(
        LogTag::Webserver,
        &format!(
            "Chat server listening on http://{} (ws path {})",
            addr, state.config.websocket.path
        ),
    );

    let shutdown_signal = async {
        SHUTDOWN_NOTIFY.notified().await;
        logger::info(
            LogTag::Webserver,
            "Received shutdown signal, stopping webserver...",
        );
    };

    serve(listener, state, shutdown_signal).await?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");

    Ok(())
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Trigger webserver shutdown
pub fn shutdown() {
    logger::debug(LogTag::Webserver, "Triggering webserver shutdown...");
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes and middleware
fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
}
