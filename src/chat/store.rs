/// Message store - bounded log, reaction index and session identities
///
/// The store is the single owner of chat state. Mutations run inside one
/// exclusive section that also stamps and publishes the resulting event, so
/// the event sink sees mutations in the same order they were applied.
/// Readers always receive copies.
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::{
    arguments::is_debug_store_enabled,
    config::ChatConfig,
    logger::{self, LogTag},
};

use super::error::{ChatError, ChatResult};
use super::events::{ChatEvent, EventSink, ReactionAction, ReactionUpdate, SequencedEvent};
use super::message::{Message, MessageLimits};

/// Snapshot of the log together with the sequence number of the last event
/// already reflected in it
#[derive(Debug, Clone)]
pub struct SyncPoint {
    pub messages: Vec<Message>,
    pub last_seq: u64,
}

struct StoreState {
    messages: VecDeque<Message>,
    last_seq: u64,
}

impl StoreState {
    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }
}

/// Authoritative chat state
pub struct Store {
    state: RwLock<StoreState>,
    /// Connection identity -> session id
    sessions: Mutex<HashMap<String, String>>,
    sink: Arc<dyn EventSink>,
    limits: MessageLimits,
    max_messages: usize,
}

impl Store {
    /// Create a store publishing change events into `sink`
    pub fn new(config: &ChatConfig, sink: Arc<dyn EventSink>) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(StoreState {
                messages: VecDeque::with_capacity(config.max_messages),
                last_seq: 0,
            }),
            sessions: Mutex::new(HashMap::new()),
            sink,
            limits: MessageLimits::from(config),
            max_messages: config.max_messages.max(1),
        })
    }

    /// Validate and append a message, evicting the oldest beyond the cap
    ///
    /// Emits a `message` event on success; nothing on validation failure.
    pub fn submit(&self, text: &str, author_name: &str, author_id: &str) -> ChatResult<Message> {
        let msg = Message::new(text, author_name, author_id, &self.limits)?;

        let evicted = {
            let mut state = self.state.write();
            state.messages.push_back(msg.clone());

            let mut evicted = 0;
            while state.messages.len() > self.max_messages {
                state.messages.pop_front();
                evicted += 1;
            }

            let seq = state.next_seq();
            self.sink.publish(SequencedEvent {
                seq,
                event: ChatEvent::Message(msg.clone()),
            });
            evicted
        };

        if is_debug_store_enabled() {
            logger::debug(
                LogTag::Store,
                &format!(
                    "new message [{}]: {:?} from {} (evicted={})",
                    msg.short_id(),
                    msg.text,
                    msg.author_name,
                    evicted
                ),
            );
        }

        Ok(msg)
    }

    /// Independent copy of the current log, oldest first
    pub fn snapshot(&self) -> Vec<Message> {
        self.state.read().messages.iter().cloned().collect()
    }

    /// Snapshot plus the sequence number of the last event it already reflects
    pub fn sync_point(&self) -> SyncPoint {
        let state = self.state.read();
        SyncPoint {
            messages: state.messages.iter().cloned().collect(),
            last_seq: state.last_seq,
        }
    }

    /// Messages created strictly after `timestamp`, in log order
    pub fn since(&self, timestamp: i64) -> Vec<Message> {
        self.state
            .read()
            .messages
            .iter()
            .filter(|msg| msg.created_at > timestamp)
            .cloned()
            .collect()
    }

    /// Number of messages currently retained
    pub fn len(&self) -> usize {
        self.state.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Toggle `user_id`'s `emoji` reaction on a message
    ///
    /// Lookup, mutation and event emission happen in one exclusive section.
    pub fn toggle_reaction(
        &self,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> ChatResult<ReactionAction> {
        let action = {
            let mut state = self.state.write();

            let Some(msg) = state.messages.iter_mut().find(|m| m.id == message_id) else {
                return Err(ChatError::MessageNotFound(message_id.to_string()));
            };

            let action = msg.toggle_reaction(emoji, user_id);
            let update = ReactionUpdate {
                message_id: message_id.to_string(),
                emoji: emoji.to_string(),
                user_id: user_id.to_string(),
                action,
                message: msg.clone(),
            };

            let seq = state.next_seq();
            self.sink.publish(SequencedEvent {
                seq,
                event: ChatEvent::ReactionUpdated(update),
            });
            action
        };

        if is_debug_store_enabled() {
            logger::debug(
                LogTag::Store,
                &format!(
                    "reaction {} {:?} on message {} by {}",
                    emoji,
                    action,
                    message_id.get(..8).unwrap_or(message_id),
                    user_id
                ),
            );
        }

        Ok(action)
    }

    /// Session id for a connection identity, minted on first sight
    pub fn session_for(&self, identity: &str) -> String {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(identity) {
            return existing.clone();
        }

        let session_id = format!("user_{}", uuid::Uuid::new_v4().simple());
        sessions.insert(identity.to_string(), session_id.clone());
        drop(sessions);

        if is_debug_store_enabled() {
            logger::debug(
                LogTag::Store,
                &format!("new user session: {} for {}", session_id, identity),
            );
        }

        session_id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::thread;

    /// Sink that records every published event
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub events: Mutex<Vec<SequencedEvent>>,
    }

    impl RecordingSink {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn events(&self) -> Vec<SequencedEvent> {
            self.events.lock().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn publish(&self, event: SequencedEvent) {
            self.events.lock().push(event);
        }
    }

    fn store_with_sink() -> (Arc<Store>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let store = Store::new(&ChatConfig::default(), sink.clone());
        (store, sink)
    }

    #[test]
    fn test_submit_stores_trimmed_text_and_emits() {
        let (store, sink) = store_with_sink();

        let msg = store.submit("  hello  ", "Ann", "user_1").unwrap();
        assert_eq!(msg.text, "hello");

        let snapshot = store.snapshot();
        assert_eq!(snapshot, vec![msg.clone()]);

        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[0].event, ChatEvent::Message(msg));
    }

    #[test]
    fn test_invalid_submissions_store_and_emit_nothing() {
        let (store, sink) = store_with_sink();

        assert_eq!(store.submit("   ", "Ann", "u").unwrap_err(), ChatError::EmptyText);
        assert_eq!(
            store.submit(&"z".repeat(501), "Ann", "u").unwrap_err(),
            ChatError::TooLong { max: 500 }
        );

        assert!(store.is_empty());
        assert!(sink.events.lock().is_empty());
    }

    #[test]
    fn test_log_evicts_oldest_beyond_cap() {
        let (store, _sink) = store_with_sink();

        for i in 0..1001 {
            store.submit(&format!("message {}", i), "bot", "bot_0").unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1000);
        assert_eq!(snapshot.first().unwrap().text, "message 1");
        assert_eq!(snapshot.last().unwrap().text, "message 1000");
        for (i, msg) in snapshot.iter().enumerate() {
            assert_eq!(msg.text, format!("message {}", i + 1));
        }
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let (store, _sink) = store_with_sink();
        let msg = store.submit("first", "Ann", "u").unwrap();

        let before = store.snapshot();
        store.toggle_reaction(&msg.id, "🔥", "user_x").unwrap();
        store.submit("second", "Ann", "u").unwrap();

        assert_eq!(before.len(), 1);
        assert!(before[0].reactions.is_empty());
        assert_eq!(store.snapshot()[0].reactions.len(), 1);
    }

    #[test]
    fn test_since_is_strictly_after() {
        let (store, _sink) = store_with_sink();
        store.submit("a", "Ann", "u").unwrap();
        store.submit("b", "Ann", "u").unwrap();

        let all = store.since(i64::MIN);
        assert_eq!(
            all.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let newest = all.iter().map(|m| m.created_at).max().unwrap();
        assert!(store.since(newest).is_empty());
    }

    #[test]
    fn test_toggle_twice_is_a_net_no_op() {
        let (store, sink) = store_with_sink();
        let msg = store.submit("react to me", "Ann", "u").unwrap();

        let first = store.toggle_reaction(&msg.id, "👍", "user_a").unwrap();
        let second = store.toggle_reaction(&msg.id, "👍", "user_a").unwrap();

        assert_eq!(first, ReactionAction::Added);
        assert_eq!(second, ReactionAction::Removed);
        assert_eq!(store.snapshot()[0].reactions, msg.reactions);

        let events = sink.events.lock();
        assert_eq!(events.len(), 3);
        match &events[2].event {
            ChatEvent::ReactionUpdated(update) => {
                assert_eq!(update.action, ReactionAction::Removed);
                assert_eq!(update.user_id, "user_a");
                assert!(update.message.reactions.is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_toggle_unknown_message_fails_without_event() {
        let (store, sink) = store_with_sink();
        store.submit("hello", "Ann", "u").unwrap();

        let err = store.toggle_reaction("missing-id", "👍", "user_a").unwrap_err();
        assert_eq!(err, ChatError::MessageNotFound("missing-id".to_string()));
        assert_eq!(sink.events.lock().len(), 1);
    }

    #[test]
    fn test_concurrent_toggles_by_different_users_both_apply() {
        let (store, _sink) = store_with_sink();
        let msg = store.submit("popular", "Ann", "u").unwrap();

        let handles: Vec<_> = ["user_a", "user_b"]
            .into_iter()
            .map(|user| {
                let store = Arc::clone(&store);
                let id = msg.id.clone();
                thread::spawn(move || store.toggle_reaction(&id, "❤️", user).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), ReactionAction::Added);
        }

        let reactors = store.snapshot()[0].reactions["❤️"].clone();
        assert_eq!(reactors.len(), 2);
        assert!(reactors.contains(&"user_a".to_string()));
        assert!(reactors.contains(&"user_b".to_string()));
    }

    #[test]
    fn test_sequence_numbers_are_monotonic_under_contention() {
        let (store, sink) = store_with_sink();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        store.submit(&format!("t{} m{}", t, i), "bot", "bot").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = sink.events.lock();
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=200).collect::<Vec<_>>());
        assert_eq!(store.sync_point().last_seq, 200);
    }

    #[test]
    fn test_session_minting_is_idempotent() {
        let (store, _sink) = store_with_sink();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.session_for("10.0.0.1:5000"))
            })
            .collect();
        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.iter().all(|id| id == &ids[0]));
        assert!(ids[0].starts_with("user_"));
        assert_ne!(store.session_for("10.0.0.2:5000"), ids[0]);
    }
}
