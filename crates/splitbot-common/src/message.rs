use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub is_bot: bool,
}

impl Author {
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::from_string(id),
            name: name.into(),
            is_bot: false,
        }
    }

    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::from_string(id),
            name: name.into(),
            is_bot: true,
        }
    }
}

/// A message delivered by the messaging platform adapter.
///
/// The adapter resolves the platform-specific addressing (mentions, replies,
/// DM channels) into plain flags so that trigger evaluation stays
/// platform-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: Author,
    pub content: String,
    pub channel_is_direct: bool,
    pub mentions_bot: bool,
    pub mentions_bot_role: bool,
    pub is_reply_to_bot: bool,
    pub created_at: DateTime<Utc>,
}

impl InboundMessage {
    /// A plain guild message with no addressing flags set.
    pub fn text(channel_id: ChannelId, author: Author, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            channel_id,
            author,
            content: text.into(),
            channel_is_direct: false,
            mentions_bot: false,
            mentions_bot_role: false,
            is_reply_to_bot: false,
            created_at: Utc::now(),
        }
    }
}

/// A message read back from channel history when building the context window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&InboundMessage> for HistoryMessage {
    fn from(msg: &InboundMessage) -> Self {
        Self {
            author: msg.author.clone(),
            content: msg.content.clone(),
            created_at: msg.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_text_factory() {
        let channel_id = ChannelId::from_string("42");
        let author = Author::user("7", "alice");

        let start_time = Utc::now();
        let message = InboundMessage::text(channel_id.clone(), author.clone(), "hello there");
        let end_time = Utc::now();

        assert!(!message.id.as_str().is_empty());
        assert_eq!(message.channel_id, channel_id);
        assert_eq!(message.author, author);
        assert_eq!(message.content, "hello there");
        assert!(!message.channel_is_direct);
        assert!(!message.mentions_bot);
        assert!(!message.mentions_bot_role);
        assert!(!message.is_reply_to_bot);
        assert!(message.created_at >= start_time);
        assert!(message.created_at <= end_time);
    }

    #[test]
    fn history_from_inbound_copies_author_and_time() {
        let msg = InboundMessage::text(ChannelId::new(), Author::bot("1", "helper"), "beep");
        let history = HistoryMessage::from(&msg);
        assert!(history.author.is_bot);
        assert_eq!(history.content, "beep");
        assert_eq!(history.created_at, msg.created_at);
    }
}
