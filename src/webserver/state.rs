/// Shared application state for the webserver
///
/// Contains references to the chat core and shared resources
/// that need to be accessed by route handlers.
use std::sync::Arc;

use crate::{
    chat::Store,
    config::Config,
    webserver::ws::{ConnectionSlots, HubHandle},
};

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration
    pub config: Arc<Config>,

    /// Authoritative chat state
    pub store: Arc<Store>,

    /// Broadcast hub
    pub hub: HubHandle,

    /// Live WebSocket connection slots
    pub slots: ConnectionSlots,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Wire a store to a hub
    ///
    /// The store publishes into the hub, so the hub must exist first.
    pub fn new(config: Config, hub: HubHandle) -> Self {
        let store = Store::new(&config.chat, Arc::new(hub.clone()));
        let slots = ConnectionSlots::new(config.websocket.max_connections);

        Self {
            config: Arc::new(config),
            store,
            hub,
            slots,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
