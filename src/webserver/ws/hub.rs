/// Central WebSocket Hub - registry and broadcaster
///
/// The hub is the single authority on who is connected. One task owns the
/// registry and processes register / unregister / broadcast intents strictly
/// in arrival order, so no lock guards the registry at all.
///
/// Broadcast never waits on a client: each frame is offered with
/// `try_send`, clients whose queue is full are collected during the pass
/// and evicted once it completes.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::{
    arguments::is_debug_hub_enabled,
    chat::{EventSink, SequencedEvent},
    logger::{self, LogTag},
};

use super::message::{OutboundFrame, ServerEvent};
use super::metrics::HubMetrics;

// ============================================================================
// HUB TYPES
// ============================================================================

/// Connection ID (unique per WebSocket connection)
pub type ConnectionId = u64;

/// Registry entry for one live connection
#[derive(Debug)]
pub struct ClientHandle {
    pub id: ConnectionId,
    pub user_id: String,
    /// Bounded outbound queue; dropping it closes the queue for the writer
    pub sender: mpsc::Sender<OutboundFrame>,
}

enum HubCommand {
    Register(ClientHandle),
    Unregister(ConnectionId),
    Broadcast(SequencedEvent),
    Count(oneshot::Sender<usize>),
}

// ============================================================================
// HUB HANDLE
// ============================================================================

/// Cheap, cloneable entry point to the hub task
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    next_conn_id: Arc<AtomicU64>,
    metrics: Arc<HubMetrics>,
}

impl HubHandle {
    /// Spawn the hub task on the current runtime
    ///
    /// The task exits once every handle has been dropped.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = HubMetrics::new();

        let hub = Hub {
            clients: HashMap::new(),
            commands: rx,
            metrics: Arc::clone(&metrics),
        };
        tokio::spawn(hub.run());

        Self {
            commands: tx,
            next_conn_id: Arc::new(AtomicU64::new(1)),
            metrics,
        }
    }

    /// Allocate an id for a new connection
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a client; visible to every broadcast submitted after this call
    pub fn register(&self, client: ClientHandle) {
        self.send(HubCommand::Register(client));
    }

    /// Remove a client and close its queue; no-op if already gone
    pub fn unregister(&self, conn_id: ConnectionId) {
        self.send(HubCommand::Unregister(conn_id));
    }

    /// Fan an event out to every registered client
    pub fn broadcast(&self, event: SequencedEvent) {
        self.send(HubCommand::Broadcast(event));
    }

    /// Registry size, as seen after every intent submitted before this call
    pub async fn registered_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Count(tx));
        rx.await.unwrap_or(0)
    }

    /// Get hub metrics
    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.metrics)
    }

    fn send(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            logger::warning(LogTag::Hub, "Hub task is not running; intent dropped");
        }
    }
}

impl EventSink for HubHandle {
    fn publish(&self, event: SequencedEvent) {
        self.broadcast(event);
    }
}

// ============================================================================
// HUB TASK
// ============================================================================

struct Hub {
    clients: HashMap<ConnectionId, ClientHandle>,
    commands: mpsc::UnboundedReceiver<HubCommand>,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register(client) => self.register(client),
                HubCommand::Unregister(conn_id) => {
                    self.remove(conn_id, "disconnected");
                }
                HubCommand::Broadcast(event) => self.broadcast(event),
                HubCommand::Count(reply) => {
                    let _ = reply.send(self.clients.len());
                }
            }
        }

        if is_debug_hub_enabled() {
            logger::debug(LogTag::Hub, "Hub task stopped (all handles dropped)");
        }
    }

    fn register(&mut self, client: ClientHandle) {
        let conn_id = client.id;
        let user_id = client.user_id.clone();
        self.clients.insert(conn_id, client);
        self.metrics.connection_opened();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "client {} ({}) registered (active={})",
                    conn_id,
                    user_id,
                    self.clients.len()
                ),
            );
        }
    }

    /// Drop the registry entry, which closes the client's queue
    fn remove(&mut self, conn_id: ConnectionId, reason: &str) -> bool {
        let Some(client) = self.clients.remove(&conn_id) else {
            return false;
        };
        self.metrics.connection_closed();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "client {} ({}) {} (active={})",
                    conn_id,
                    client.user_id,
                    reason,
                    self.clients.len()
                ),
            );
        }
        true
    }

    fn broadcast(&mut self, event: SequencedEvent) {
        if self.clients.is_empty() {
            return;
        }

        let text = match ServerEvent::from(&event.event).to_json() {
            Ok(text) => text,
            Err(e) => {
                self.metrics.encode_failed();
                logger::error(
                    LogTag::Hub,
                    &format!(
                        "Failed to encode {} event #{}: {}",
                        event.event.kind(),
                        event.seq,
                        e
                    ),
                );
                return;
            }
        };
        let frame = OutboundFrame {
            seq: event.seq,
            text: text.into(),
        };

        let mut sent = 0;
        let mut slow_consumers = Vec::new();

        for (conn_id, client) in &self.clients {
            match client.sender.try_send(frame.clone()) {
                Ok(()) => sent += 1,
                Err(mpsc::error::TrySendError::Full(_)) => slow_consumers.push(*conn_id),
                // Writer already gone; its session will unregister shortly
                Err(mpsc::error::TrySendError::Closed(_)) => slow_consumers.push(*conn_id),
            }
        }
        self.metrics.broadcast_completed(sent);

        for conn_id in slow_consumers {
            if self.remove(conn_id, "evicted as slow consumer") {
                self.metrics.slow_consumer_evicted();
                logger::warning(
                    LogTag::Hub,
                    &format!("Evicted client {}: outbound queue full or closed", conn_id),
                );
            }
        }

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "broadcast {} #{} (sent={}, active={})",
                    event.event.kind(),
                    event.seq,
                    sent,
                    self.clients.len()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatEvent, Message, MessageLimits};
    use std::time::Duration;
    use tokio::time::timeout;

    fn event(seq: u64, text: &str) -> SequencedEvent {
        let msg = Message::new(text, "Ann", "user_1", &MessageLimits::default()).unwrap();
        SequencedEvent {
            seq,
            event: ChatEvent::Message(msg),
        }
    }

    fn client(hub: &HubHandle, capacity: usize) -> (ClientHandle, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = hub.next_connection_id();
        (
            ClientHandle {
                id,
                user_id: format!("user_{}", id),
                sender: tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_hub_registration() {
        let hub = HubHandle::spawn();

        let (c1, _rx1) = client(&hub, 10);
        let (c2, _rx2) = client(&hub, 10);
        let id1 = c1.id;
        assert_ne!(c1.id, c2.id);

        hub.register(c1);
        hub.register(c2);
        assert_eq!(hub.registered_count().await, 2);

        hub.unregister(id1);
        assert_eq!(hub.registered_count().await, 1);

        // Duplicate teardown is tolerated
        hub.unregister(id1);
        assert_eq!(hub.registered_count().await, 1);
        assert_eq!(hub.metrics().snapshot().active_connections, 1);
    }

    #[tokio::test]
    async fn test_hub_broadcast() {
        let hub = HubHandle::spawn();
        let (c, mut rx) = client(&hub, 10);
        hub.register(c);

        hub.broadcast(event(7, "hello"));

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.seq, 7);
        let json: serde_json::Value = serde_json::from_str(&frame.text).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["text"], "hello");
    }

    #[tokio::test]
    async fn test_broadcast_with_no_clients_is_noop() {
        let hub = HubHandle::spawn();
        hub.broadcast(event(1, "nobody home"));

        assert_eq!(hub.registered_count().await, 0);
        assert_eq!(hub.metrics().snapshot().broadcasts, 0);
    }

    #[tokio::test]
    async fn test_unregister_closes_queue() {
        let hub = HubHandle::spawn();
        let (c, mut rx) = client(&hub, 10);
        let id = c.id;
        hub.register(c);
        hub.broadcast(event(1, "last words"));
        hub.unregister(id);

        // Queued frame drains first, then the queue reports closed
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_consumer_evicted_without_delaying_others() {
        let hub = HubHandle::spawn();

        let (slow, mut slow_rx) = client(&hub, 1);
        let slow_id = slow.id;
        hub.register(slow);

        let mut healthy = Vec::new();
        for _ in 0..10 {
            let (c, rx) = client(&hub, 16);
            hub.register(c);
            healthy.push(rx);
        }

        // Saturate the slow client's queue
        hub.broadcast(event(1, "fills the slow queue"));
        hub.broadcast(event(2, "overflows it"));

        for rx in healthy.iter_mut() {
            for expected_seq in [1, 2] {
                let frame = timeout(Duration::from_secs(1), rx.recv())
                    .await
                    .expect("healthy client starved")
                    .expect("healthy client queue closed");
                assert_eq!(frame.seq, expected_seq);
            }
        }

        assert_eq!(hub.registered_count().await, 10);
        assert_eq!(hub.metrics().snapshot().slow_consumers_evicted, 1);

        // The slow client keeps what fit, then sees its queue closed
        assert_eq!(slow_rx.recv().await.unwrap().seq, 1);
        assert!(slow_rx.recv().await.is_none());

        // Evicted client is gone for good
        hub.unregister(slow_id);
        assert_eq!(hub.registered_count().await, 10);
    }

    #[tokio::test]
    async fn test_register_is_visible_to_next_broadcast() {
        let hub = HubHandle::spawn();
        hub.broadcast(event(1, "before"));

        let (c, mut rx) = client(&hub, 10);
        hub.register(c);
        hub.broadcast(event(2, "after"));

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.seq, 2);
    }
}
