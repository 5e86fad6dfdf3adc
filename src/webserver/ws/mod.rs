/// Real-time WebSocket layer
///
/// One persistent connection per client carries chat envelopes in both
/// directions.
///
/// ## Architecture
/// - Single upgrade endpoint, admission-limited
/// - One hub task serializes register / unregister / broadcast
/// - Per-connection bounded queues; a full queue gets its client evicted
/// - Snapshot on connect, then sequenced deltas
///
/// ## Key Components
/// - `hub`: registry and broadcast fan-out
/// - `connection`: per-connection reader and writer
/// - `message`: wire envelopes (inbound and outbound)
/// - `admission`: live connection ceiling
/// - `rate_limit`: fixed-window submission limiter
/// - `health`: heartbeat and deadline settings
/// - `metrics`: hub and per-connection counters
pub mod admission;
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod rate_limit;

pub use admission::{ConnectionSlots, SlotGuard};
pub use hub::{ClientHandle, ConnectionId, HubHandle};
pub use message::{ClientMessage, OutboundFrame, ServerEvent};
