/// HTTP and WebSocket surface of the chat server
///
/// ## Key Components
/// - `routes`: health check and the WebSocket upgrade endpoint
/// - `ws`: hub, per-connection sessions and the wire protocol
/// - `state`: shared handles passed to route handlers
/// - `server`: bind, serve and graceful shutdown
mod server;

pub mod routes;
pub mod state;
pub mod ws;

// Public API for starting/stopping the webserver
pub use server::{serve, shutdown, start_server, ServerError};
pub use state::AppState;
