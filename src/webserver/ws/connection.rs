/// WebSocket connection handler
///
/// Each connection runs as two halves:
/// - writer: initial snapshot, then hub deltas, direct replies and heartbeat
/// - reader: decodes client requests and forwards them to the store
///
/// The session registers with the hub before reading the snapshot. Any hub
/// frame already reflected in that snapshot is skipped by sequence number, so
/// every message reaches the client exactly once and the snapshot comes first.
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::{
    arguments::is_debug_session_enabled,
    chat::{ChatError, Message, Store},
    logger::{self, LogTag},
    webserver::state::AppState,
};

use super::{
    admission::SlotGuard,
    health::{heartbeat_ticker, HealthConfig},
    hub::{ClientHandle, ConnectionId},
    message::{AddReactionRequest, ClientMessage, OutboundFrame, ProtocolError, SendMessageRequest, ServerEvent},
    metrics::ConnectionMetrics,
    rate_limit::RateLimiter,
};

/// Reply sent when a `send_message` payload cannot be decoded
const INVALID_MESSAGE_FORMAT: &str = "Invalid message format";

/// Conditions that end one connection; never affect others
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("write timed out after {0}s")]
    WriteTimeout(u64),

    #[error("no inbound frame within {0}s")]
    IdleTimeout(u64),

    #[error("failed to encode outbound event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Handle an upgraded WebSocket connection until it ends
///
/// `identity` is the peer address the session id is keyed on. The admission
/// slot is released when this function returns.
pub async fn handle_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    identity: String,
    slot: SlotGuard,
) {
    let ws_cfg = &state.config.websocket;
    let conn_id = state.hub.next_connection_id();
    let user_id = state.store.session_for(&identity);
    let health = HealthConfig::from_config(ws_cfg);
    let metrics = ConnectionMetrics::new();

    let (hub_tx, hub_rx) = mpsc::channel(ws_cfg.outbound_queue_size.max(1));
    let (reply_tx, reply_rx) = mpsc::channel(ws_cfg.reply_queue_size.max(1));

    // Register first; the snapshot taken afterwards covers everything the
    // hub has not yet delivered into our queue
    state.hub.register(ClientHandle {
        id: conn_id,
        user_id: user_id.clone(),
        sender: hub_tx,
    });
    let sync = state.store.sync_point();

    if is_debug_session_enabled() {
        logger::debug(
            LogTag::Session,
            &format!(
                "Connection {} started for {} ({}), snapshot={} messages at seq {}",
                conn_id,
                user_id,
                identity,
                sync.messages.len(),
                sync.last_seq
            ),
        );
    }

    let (ws_tx, ws_rx) = socket.split();

    let writer = Writer {
        conn_id,
        sync_seq: sync.last_seq,
        health: health.clone(),
        metrics: Arc::clone(&metrics),
    };
    let mut writer_task = tokio::spawn(writer.run(ws_tx, sync.messages, reply_rx, hub_rx));

    let reader = Reader {
        conn_id,
        user_id,
        store: Arc::clone(&state.store),
        limiter: RateLimiter::new(&state.config.rate_limit),
        idle_timeout: health.idle_timeout,
        replies: reply_tx,
        metrics: Arc::clone(&metrics),
    };

    let writer_finished_first = tokio::select! {
        result = reader.run(ws_rx) => {
            log_session_end(conn_id, "reader", result);
            false
        }
        joined = &mut writer_task => {
            match joined {
                Ok(result) => log_session_end(conn_id, "writer", result),
                Err(e) => logger::error(
                    LogTag::Session,
                    &format!("Connection {}: writer task failed: {}", conn_id, e),
                ),
            }
            true
        }
    };

    // Exactly one unregister per connection; closing the hub queue stops the writer
    state.hub.unregister(conn_id);

    if !writer_finished_first {
        match writer_task.await {
            Ok(result) => log_session_end(conn_id, "writer", result),
            Err(e) => logger::error(
                LogTag::Session,
                &format!("Connection {}: writer task failed: {}", conn_id, e),
            ),
        }
    }

    drop(slot);

    if is_debug_session_enabled() {
        let snapshot = metrics.snapshot();
        logger::debug(
            LogTag::Session,
            &format!(
                "Connection {} closed (sent={}, received={}, skipped={}, rate_limited={}, decode_errors={})",
                conn_id,
                snapshot.frames_sent,
                snapshot.frames_received,
                snapshot.frames_skipped,
                snapshot.rate_limited,
                snapshot.decode_errors
            ),
        );
    }
}

fn log_session_end(conn_id: ConnectionId, half: &str, result: Result<(), SessionError>) {
    match result {
        Ok(()) => {
            if is_debug_session_enabled() {
                logger::debug(
                    LogTag::Session,
                    &format!("Connection {}: {} finished", conn_id, half),
                );
            }
        }
        Err(e) => logger::warning(
            LogTag::Session,
            &format!("Connection {}: {} stopped: {}", conn_id, half, e),
        ),
    }
}

// ============================================================================
// WRITER
// ============================================================================

struct Writer {
    conn_id: ConnectionId,
    /// Last store sequence already covered by the snapshot
    sync_seq: u64,
    health: HealthConfig,
    metrics: Arc<ConnectionMetrics>,
}

impl Writer {
    async fn run<S>(
        self,
        mut sink: S,
        snapshot: Vec<Message>,
        mut replies: mpsc::Receiver<OutboundFrame>,
        mut hub_rx: mpsc::Receiver<OutboundFrame>,
    ) -> Result<(), SessionError>
    where
        S: Sink<WsMessage> + Unpin,
        S::Error: Display,
    {
        for msg in &snapshot {
            let text = ServerEvent::Message(msg).to_json()?;
            self.write(&mut sink, WsMessage::Text(text)).await?;
            self.metrics.inc_sent();
        }

        let mut heartbeat = heartbeat_ticker(self.health.heartbeat_interval);

        loop {
            tokio::select! {
                biased;

                Some(frame) = replies.recv() => {
                    self.write(&mut sink, WsMessage::Text(frame.text.to_string())).await?;
                    self.metrics.inc_sent();
                }

                frame = hub_rx.recv() => {
                    let Some(frame) = frame else {
                        // Unregistered or evicted by the hub
                        let _ = self.write(&mut sink, WsMessage::Close(None)).await;
                        return Ok(());
                    };

                    if frame.seq != 0 && frame.seq <= self.sync_seq {
                        self.metrics.inc_skipped();
                        continue;
                    }

                    self.write(&mut sink, WsMessage::Text(frame.text.to_string())).await?;
                    self.metrics.inc_sent();
                }

                _ = heartbeat.tick() => {
                    if is_debug_session_enabled() {
                        logger::verbose(
                            LogTag::Session,
                            &format!("Connection {}: sending ping", self.conn_id),
                        );
                    }
                    self.write(&mut sink, WsMessage::Ping(Vec::new())).await?;
                }
            }
        }
    }

    /// One bounded write
    async fn write<S>(&self, sink: &mut S, msg: WsMessage) -> Result<(), SessionError>
    where
        S: Sink<WsMessage> + Unpin,
        S::Error: Display,
    {
        match timeout(self.health.write_timeout, sink.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Transport(e.to_string())),
            Err(_) => Err(SessionError::WriteTimeout(
                self.health.write_timeout.as_secs(),
            )),
        }
    }
}

// ============================================================================
// READER
// ============================================================================

struct Reader {
    conn_id: ConnectionId,
    user_id: String,
    store: Arc<Store>,
    limiter: RateLimiter,
    idle_timeout: Duration,
    replies: mpsc::Sender<OutboundFrame>,
    metrics: Arc<ConnectionMetrics>,
}

impl Reader {
    async fn run<S, E>(mut self, mut stream: S) -> Result<(), SessionError>
    where
        S: Stream<Item = Result<WsMessage, E>> + Unpin,
        E: Display,
    {
        loop {
            let next = timeout(self.idle_timeout, stream.next())
                .await
                .map_err(|_| SessionError::IdleTimeout(self.idle_timeout.as_secs()))?;

            match next {
                Some(Ok(WsMessage::Text(text))) => {
                    self.metrics.inc_received();
                    self.handle_text(&text).await?;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    if is_debug_session_enabled() {
                        logger::debug(
                            LogTag::Session,
                            &format!("Connection {}: client closed", self.conn_id),
                        );
                    }
                    return Ok(());
                }
                // Pings, pongs and binary frames only refresh the read deadline
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
            }
        }
    }

    async fn handle_text(&mut self, text: &str) -> Result<(), SessionError> {
        match ClientMessage::decode(text) {
            Ok(ClientMessage::SendMessage(req)) => self.handle_send(req).await,
            Ok(ClientMessage::AddReaction(req)) => {
                self.handle_reaction(req);
                Ok(())
            }
            Err(ProtocolError::InvalidPayload { kind, source }) if kind == "send_message" => {
                self.metrics.inc_decode_errors();
                logger::warning(
                    LogTag::Session,
                    &format!("Connection {}: invalid send_message payload: {}", self.conn_id, source),
                );
                self.reply_error(INVALID_MESSAGE_FORMAT).await
            }
            Err(e) => {
                self.metrics.inc_decode_errors();
                logger::warning(
                    LogTag::Session,
                    &format!("Connection {}: {}", self.conn_id, e),
                );
                Ok(())
            }
        }
    }

    async fn handle_send(&mut self, req: SendMessageRequest) -> Result<(), SessionError> {
        if !self.limiter.check() {
            self.metrics.inc_rate_limited();
            let err = self.limiter.exceeded();
            if is_debug_session_enabled() {
                logger::debug(
                    LogTag::Session,
                    &format!("Connection {}: {}", self.conn_id, err),
                );
            }
            return self.reply_error(&err.to_string()).await;
        }

        match self.store.submit(&req.text, &req.author_name, &self.user_id) {
            Ok(_) => Ok(()),
            Err(e) if e.is_validation() => self.reply_error(&e.to_string()).await,
            Err(e) => {
                logger::warning(
                    LogTag::Session,
                    &format!("Connection {}: submit failed: {}", self.conn_id, e),
                );
                Ok(())
            }
        }
    }

    fn handle_reaction(&self, req: AddReactionRequest) {
        match self
            .store
            .toggle_reaction(&req.message_id, &req.emoji, &self.user_id)
        {
            Ok(_) => {}
            Err(ChatError::MessageNotFound(id)) => logger::warning(
                LogTag::Session,
                &format!("Connection {}: reaction on unknown message {}", self.conn_id, id),
            ),
            Err(e) => logger::warning(
                LogTag::Session,
                &format!("Connection {}: reaction failed: {}", self.conn_id, e),
            ),
        }
    }

    /// Queue an `error` event for this connection only
    async fn reply_error(&self, error: &str) -> Result<(), SessionError> {
        let text = ServerEvent::Error { error }.to_json()?;
        self.replies
            .send(OutboundFrame::unsequenced(text))
            .await
            .map_err(|_| SessionError::Transport("writer closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatEvent, MessageLimits, SequencedEvent};
    use crate::chat::store::tests::RecordingSink;
    use crate::config::{ChatConfig, RateLimitConfig};
    use futures::channel::mpsc as fmpsc;
    use std::convert::Infallible;

    fn test_health() -> HealthConfig {
        HealthConfig {
            heartbeat_interval: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(1),
        }
    }

    fn message(text: &str) -> Message {
        Message::new(text, "Ann", "user_1", &MessageLimits::default()).unwrap()
    }

    fn hub_frame(seq: u64, msg: &Message) -> OutboundFrame {
        let event = ChatEvent::Message(msg.clone());
        OutboundFrame {
            seq,
            text: ServerEvent::from(&event).to_json().unwrap().into(),
        }
    }

    fn texts(frames: Vec<WsMessage>) -> Vec<serde_json::Value> {
        frames
            .into_iter()
            .filter_map(|f| match f {
                WsMessage::Text(t) => Some(serde_json::from_str(&t).unwrap()),
                _ => None,
            })
            .collect()
    }

    fn reader(store: Arc<Store>, limit: u32) -> (Reader, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(64);
        let cfg = RateLimitConfig {
            enabled: true,
            max_messages: limit,
            window_secs: 60,
        };
        (
            Reader {
                conn_id: 1,
                user_id: "user_test".to_string(),
                store,
                limiter: RateLimiter::new(&cfg),
                idle_timeout: Duration::from_secs(5),
                replies: tx,
                metrics: ConnectionMetrics::new(),
            },
            rx,
        )
    }

    fn text_frame(json: &str) -> Result<WsMessage, Infallible> {
        Ok(WsMessage::Text(json.to_string()))
    }

    #[tokio::test]
    async fn test_writer_sends_snapshot_then_skips_covered_deltas() {
        let old = message("already in snapshot");
        let fresh = message("after snapshot");

        let (sink, out) = fmpsc::unbounded::<WsMessage>();
        let (_reply_tx, reply_rx) = mpsc::channel(4);
        let (hub_tx, hub_rx) = mpsc::channel(4);

        // Seq 1 was enqueued before the snapshot was taken at seq 1
        hub_tx.send(hub_frame(1, &old)).await.unwrap();
        hub_tx.send(hub_frame(2, &fresh)).await.unwrap();
        drop(hub_tx);

        let metrics = ConnectionMetrics::new();
        let writer = Writer {
            conn_id: 1,
            sync_seq: 1,
            health: test_health(),
            metrics: Arc::clone(&metrics),
        };
        writer
            .run(sink, vec![old.clone()], reply_rx, hub_rx)
            .await
            .unwrap();

        let frames: Vec<WsMessage> = out.collect().await;
        assert!(matches!(frames.last(), Some(WsMessage::Close(_))));

        let events = texts(frames);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["data"]["id"], old.id.as_str());
        assert_eq!(events[1]["data"]["id"], fresh.id.as_str());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.frames_skipped, 1);
    }

    #[tokio::test]
    async fn test_writer_stops_on_transport_error() {
        let (sink, out) = fmpsc::unbounded::<WsMessage>();
        drop(out);
        let (_reply_tx, reply_rx) = mpsc::channel(4);
        let (_hub_tx, hub_rx) = mpsc::channel(4);

        let writer = Writer {
            conn_id: 1,
            sync_seq: 0,
            health: test_health(),
            metrics: ConnectionMetrics::new(),
        };
        let result = writer.run(sink, vec![message("hi")], reply_rx, hub_rx).await;
        assert!(matches!(result, Err(SessionError::Transport(_))));
    }

    #[tokio::test]
    async fn test_reader_submits_and_rate_limits() {
        let sink = RecordingSink::new();
        let store = Store::new(&ChatConfig::default(), sink.clone());
        let (reader, mut replies) = reader(Arc::clone(&store), 2);

        let frames = (0..3).map(|i| {
            text_frame(&format!(
                r#"{{"type":"send_message","data":{{"text":"msg {}","author_name":"Ann"}}}}"#,
                i
            ))
        });
        reader.run(futures::stream::iter(frames)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(sink.events().len(), 2);

        let reply = replies.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply.text).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(
            json["data"]["error"],
            "Rate limit exceeded. Maximum 2 messages per 60 seconds."
        );
        assert!(replies.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reader_reports_validation_and_format_errors() {
        let store = Store::new(&ChatConfig::default(), RecordingSink::new());
        let (reader, mut replies) = reader(Arc::clone(&store), 20);

        let long = "x".repeat(501);
        let frames = vec![
            text_frame(r#"{"type":"send_message","data":{"text":"   "}}"#),
            text_frame(&format!(
                r#"{{"type":"send_message","data":{{"text":"{}"}}}}"#,
                long
            )),
            text_frame(r#"{"type":"send_message","data":{"text":42}}"#),
            // Logged only
            text_frame(r#"{"type":"typing","data":{}}"#),
            text_frame("garbage"),
        ];
        reader.run(futures::stream::iter(frames)).await.unwrap();

        let mut errors = Vec::new();
        while let Ok(frame) = replies.try_recv() {
            let json: serde_json::Value = serde_json::from_str(&frame.text).unwrap();
            errors.push(json["data"]["error"].as_str().unwrap().to_string());
        }
        assert_eq!(
            errors,
            vec![
                ChatError::EmptyText.to_string(),
                ChatError::TooLong { max: 500 }.to_string(),
                INVALID_MESSAGE_FORMAT.to_string(),
            ]
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reader_reactions_are_not_rate_limited() {
        let sink = RecordingSink::new();
        let store = Store::new(&ChatConfig::default(), sink.clone());
        let target = store.submit("react to me", "Ann", "user_1").unwrap();
        let (reader, mut replies) = reader(Arc::clone(&store), 1);

        let reaction = format!(
            r#"{{"type":"add_reaction","data":{{"message_id":"{}","emoji":"🔥"}}}}"#,
            target.id
        );
        let frames = vec![
            text_frame(&reaction),
            text_frame(&reaction),
            text_frame(&reaction),
            text_frame(r#"{"type":"add_reaction","data":{"message_id":"nope","emoji":"🔥"}}"#),
        ];
        reader.run(futures::stream::iter(frames)).await.unwrap();

        // Added, removed, added; unknown id emits nothing
        let events: Vec<SequencedEvent> = sink.events();
        assert_eq!(events.len(), 4);
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].reactions["🔥"], vec!["user_test".to_string()]);
        assert!(replies.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_idle_timeout() {
        let store = Store::new(&ChatConfig::default(), RecordingSink::new());
        let (reader, _replies) = reader(store, 20);

        let result = reader
            .run(futures::stream::pending::<Result<WsMessage, Infallible>>())
            .await;
        assert!(matches!(result, Err(SessionError::IdleTimeout(5))));
    }
}
