use anyhow::Context;
use std::sync::Arc;
use tokio::sync::Notify;

use livechat::{
    arguments::{patterns, print_help},
    config,
    logger::{self, LogTag},
    traffic,
    webserver::{self, ws::HubHandle, AppState},
};

/// Main entry point for the chat server
///
/// Loads configuration, starts the hub, the optional traffic driver and the
/// webserver, then blocks until Ctrl-C.
#[tokio::main]
async fn main() {
    // .env is optional; real environment variables win
    dotenv::dotenv().ok();

    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    if let Err(e) = run().await {
        logger::error(LogTag::System, &format!("Fatal: {:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::flush();
}

async fn run() -> anyhow::Result<()> {
    logger::info(LogTag::System, "livechat starting up...");

    let config = config::load_config().context("Failed to load configuration")?;
    logger::info(
        LogTag::Config,
        &format!(
            "bind={} ws_path={} max_connections={} history={}",
            config.server.bind_address(),
            config.websocket.path,
            config.websocket.max_connections,
            config.chat.max_messages
        ),
    );

    let hub = HubHandle::spawn();
    let state = Arc::new(AppState::new(config, hub));

    let traffic_shutdown = Arc::new(Notify::new());
    let traffic_task = traffic::start(
        Arc::clone(&state.store),
        &state.config.traffic.mode,
        Arc::clone(&traffic_shutdown),
    );

    let ctrlc_traffic = Arc::clone(&traffic_shutdown);
    ctrlc::set_handler(move || {
        logger::info(LogTag::System, "Ctrl-C received, shutting down...");
        ctrlc_traffic.notify_one();
        webserver::shutdown();
    })
    .context("Failed to install Ctrl-C handler")?;

    webserver::start_server(Arc::clone(&state))
        .await
        .context("Webserver failed")?;

    traffic_shutdown.notify_one();
    if let Some(task) = traffic_task {
        let _ = task.await;
    }

    let hub_metrics = state.hub.metrics().snapshot();
    logger::info(
        LogTag::System,
        &format!(
            "Shutdown complete (uptime={}s, connections={}, broadcasts={}, evicted={}, messages={})",
            state.uptime_seconds(),
            hub_metrics.total_connections,
            hub_metrics.broadcasts,
            hub_metrics.slow_consumers_evicted,
            state.store.len()
        ),
    );

    Ok(())
}
