/// WebSocket health settings
///
/// Heartbeat period and the read/write deadlines of one connection.
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::WebSocketConfig;

/// Health monitoring configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Keep-alive period (server sends ping)
    pub heartbeat_interval: Duration,

    /// Read deadline, refreshed by every inbound frame
    pub idle_timeout: Duration,

    /// Deadline for a single write
    pub write_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::from_config(&WebSocketConfig::default())
    }
}

impl HealthConfig {
    /// Create from config values
    pub fn from_config(cfg: &WebSocketConfig) -> Self {
        Self {
            heartbeat_interval: cfg.heartbeat_interval(),
            idle_timeout: cfg.idle_timeout(),
            write_timeout: cfg.write_timeout(),
        }
    }
}

/// Create a heartbeat ticker whose first tick is one period from now
pub fn heartbeat_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_heartbeat_inside_idle_window() {
        let cfg = HealthConfig::default();
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(54));
        assert_eq!(cfg.idle_timeout, Duration::from_secs(60));
        assert_eq!(cfg.write_timeout, Duration::from_secs(10));
        assert!(cfg.heartbeat_interval < cfg.idle_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_does_not_fire_immediately() {
        let period = Duration::from_secs(5);
        let mut ticker = heartbeat_ticker(period);
        let start = Instant::now();

        ticker.tick().await;
        assert!(start.elapsed() >= period);
    }
}
