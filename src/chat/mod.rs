/// Chat domain: message log, reactions and session identities
///
/// ## Key Components
/// - `message`: the Message entity and its validation
/// - `events`: change events the store hands to the broadcast hub
/// - `store`: the bounded log, reaction toggling and session minting
/// - `error`: domain failures surfaced to submitters
pub mod error;
pub mod events;
pub mod message;
pub mod store;

pub use error::ChatError;
pub use events::{ChatEvent, EventSink, ReactionAction, ReactionUpdate, SequencedEvent};
pub use message::{Message, MessageLimits};
pub use store::{Store, SyncPoint};
