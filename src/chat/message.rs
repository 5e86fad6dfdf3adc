/// Message entity
///
/// Text, author and timestamp are fixed at creation; only the reaction
/// index changes afterwards, and only through `toggle_reaction`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{ChatError, ChatResult};
use super::events::ReactionAction;

/// Validation limits applied when a message is created
#[derive(Debug, Clone)]
pub struct MessageLimits {
    pub max_text_chars: usize,
    pub default_author_name: String,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_text_chars: 500,
            default_author_name: "Anonymous".to_string(),
        }
    }
}

impl From<&crate::config::ChatConfig> for MessageLimits {
    fn from(cfg: &crate::config::ChatConfig) -> Self {
        Self {
            max_text_chars: cfg.max_text_chars,
            default_author_name: cfg.default_author_name.clone(),
        }
    }
}

/// A chat message as stored and as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Emoji -> reactor session ids, in reaction order
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
}

impl Message {
    /// Validate input and build a new message
    ///
    /// Text is trimmed; length is counted in characters after trimming.
    pub fn new(
        text: &str,
        author_name: &str,
        author_id: &str,
        limits: &MessageLimits,
    ) -> ChatResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }
        if text.chars().count() > limits.max_text_chars {
            return Err(ChatError::TooLong {
                max: limits.max_text_chars,
            });
        }

        let author_name = if author_name.is_empty() {
            limits.default_author_name.clone()
        } else {
            author_name.to_string()
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            author_id: author_id.to_string(),
            author_name,
            created_at: chrono::Utc::now().timestamp(),
            reactions: BTreeMap::new(),
        })
    }

    /// Add `user_id` to `emoji` if absent, remove it if present
    ///
    /// An emoji key never maps to an empty list.
    pub fn toggle_reaction(&mut self, emoji: &str, user_id: &str) -> ReactionAction {
        if let Some(users) = self.reactions.get_mut(emoji) {
            if let Some(pos) = users.iter().position(|id| id == user_id) {
                users.remove(pos);
                if users.is_empty() {
                    self.reactions.remove(emoji);
                }
                return ReactionAction::Removed;
            }
            users.push(user_id.to_string());
            return ReactionAction::Added;
        }

        self.reactions
            .insert(emoji.to_string(), vec![user_id.to_string()]);
        ReactionAction::Added
    }

    /// Short id prefix for log lines
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}
