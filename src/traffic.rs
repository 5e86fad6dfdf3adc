/// Synthetic chat traffic for demos and load testing
///
/// Enabled by `MOCK_MODE` / `--mock-mode` / `[traffic] mode`. The driver is an
/// ordinary store client: it only calls `Store::submit`, so every message it
/// posts flows through the hub like any user message.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::{
    arguments::is_debug_traffic_enabled,
    chat::Store,
    logger::{self, LogTag},
};

const WELCOME_TEXT: &str = "Welcome to the chat!";
const SYSTEM_AUTHOR: &str = "System";
const SYSTEM_ID: &str = "system";

const NORMAL_SCRIPT: [&str; 5] = [
    "Great presentation!",
    "Can you share the slides?",
    "Very helpful, thanks",
    "What about mobile support?",
    "Love this new feature!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficMode {
    /// Five scripted messages, ten seconds apart
    Normal,
    /// 300 messages every 100ms from 10 bots
    Stress,
    /// 1000 messages every 20ms from 20 bots
    Extreme,
}

impl TrafficMode {
    /// Empty means disabled; any unrecognized value falls back to normal
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.trim().to_lowercase().as_str() {
            "" => None,
            "stress" => Some(TrafficMode::Stress),
            "extreme" => Some(TrafficMode::Extreme),
            "normal" => Some(TrafficMode::Normal),
            other => {
                logger::warning(
                    LogTag::Traffic,
                    &format!("Unknown traffic mode '{}', using normal", other),
                );
                Some(TrafficMode::Normal)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficMode::Normal => "normal",
            TrafficMode::Stress => "stress",
            TrafficMode::Extreme => "extreme",
        }
    }

    fn message_count(&self) -> usize {
        match self {
            TrafficMode::Normal => NORMAL_SCRIPT.len(),
            TrafficMode::Stress => 300,
            TrafficMode::Extreme => 1000,
        }
    }

    fn interval(&self) -> Duration {
        match self {
            TrafficMode::Normal => Duration::from_secs(10),
            TrafficMode::Stress => Duration::from_millis(100),
            TrafficMode::Extreme => Duration::from_millis(20),
        }
    }

    /// (text, author name, author id) of the i-th generated message
    fn message(&self, i: usize) -> (String, String, String) {
        match self {
            TrafficMode::Normal => (
                NORMAL_SCRIPT[i % NORMAL_SCRIPT.len()].to_string(),
                format!("User{}", i + 1),
                format!("user_{}", i),
            ),
            TrafficMode::Stress => (
                format!("Stress test message #{}", i),
                format!("Bot{}", i % 10),
                format!("bot_{}", i % 10),
            ),
            TrafficMode::Extreme => (
                format!("EXTREME #{} ⚡", i),
                format!("ExtremeBot{}", i % 20),
                format!("extreme_{}", i % 20),
            ),
        }
    }
}

/// Spawn the driver for `mode`; returns None when traffic is disabled
pub fn start(store: Arc<Store>, mode: &str, shutdown: Arc<Notify>) -> Option<JoinHandle<()>> {
    let mode = TrafficMode::parse(mode)?;
    logger::info(
        LogTag::Traffic,
        &format!("Synthetic traffic enabled (mode={})", mode.as_str()),
    );
    Some(tokio::spawn(run(store, mode, shutdown)))
}

/// Post the welcome message, then the mode's messages until done or shut down
pub async fn run(store: Arc<Store>, mode: TrafficMode, shutdown: Arc<Notify>) {
    submit(&store, WELCOME_TEXT, SYSTEM_AUTHOR, SYSTEM_ID);

    let interval = mode.interval();
    let total = mode.message_count();

    for i in 0..total {
        if check_shutdown_or_delay(&shutdown, interval).await {
            logger::info(
                LogTag::Traffic,
                &format!("Synthetic traffic stopped after {}/{} messages", i, total),
            );
            return;
        }

        let (text, author_name, author_id) = mode.message(i);
        submit(&store, &text, &author_name, &author_id);
    }

    logger::info(
        LogTag::Traffic,
        &format!("Synthetic traffic finished ({} messages)", total),
    );
}

fn submit(store: &Store, text: &str, author_name: &str, author_id: &str) {
    match store.submit(text, author_name, author_id) {
        Ok(msg) => {
            if is_debug_traffic_enabled() {
                logger::debug(
                    LogTag::Traffic,
                    &format!("posted [{}] as {}", msg.short_id(), author_name),
                );
            }
        }
        Err(e) => logger::warning(
            LogTag::Traffic,
            &format!("Failed to post synthetic message: {}", e),
        ),
    }
}

/// Sleep for `duration`; true if shutdown was signalled first
async fn check_shutdown_or_delay(shutdown: &Notify, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.notified() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::store::tests::RecordingSink;
    use crate::config::ChatConfig;

    #[test]
    fn test_parse_modes() {
        assert_eq!(TrafficMode::parse(""), None);
        assert_eq!(TrafficMode::parse("  "), None);
        assert_eq!(TrafficMode::parse("stress"), Some(TrafficMode::Stress));
        assert_eq!(TrafficMode::parse("EXTREME"), Some(TrafficMode::Extreme));
        assert_eq!(TrafficMode::parse("normal"), Some(TrafficMode::Normal));
        assert_eq!(TrafficMode::parse("chatty"), Some(TrafficMode::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stress_run_posts_welcome_then_bots() {
        let store = Store::new(&ChatConfig::default(), RecordingSink::new());

        run(Arc::clone(&store), TrafficMode::Stress, Arc::new(Notify::new())).await;

        let messages = store.snapshot();
        assert_eq!(messages.len(), 301);
        assert_eq!(messages[0].text, WELCOME_TEXT);
        assert_eq!(messages[0].author_name, SYSTEM_AUTHOR);
        assert_eq!(messages[0].author_id, SYSTEM_ID);
        assert_eq!(messages[1].text, "Stress test message #0");
        assert_eq!(messages[11].author_name, "Bot0");
        assert_eq!(messages[300].author_id, "bot_9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_driver() {
        let store = Store::new(&ChatConfig::default(), RecordingSink::new());
        let shutdown = Arc::new(Notify::new());

        // Stored permit is consumed by the first wait
        shutdown.notify_one();
        run(Arc::clone(&store), TrafficMode::Normal, shutdown).await;

        assert_eq!(store.len(), 1);
    }
}
