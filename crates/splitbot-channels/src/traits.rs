use async_trait::async_trait;
use splitbot_common::{HistoryMessage, Result, UserId};

/// Conversation-scoped handle to the channel a message arrived on.
///
/// One transport is created per inbound message; `reply` answers that message.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    /// Platform id of the bot account itself.
    fn bot_user_id(&self) -> &UserId;

    /// Up to `limit` most recent messages of the channel, newest first.
    async fn fetch_history(&self, limit: usize) -> Result<Vec<HistoryMessage>>;

    /// Show the "is typing" indicator.
    async fn send_typing(&self) -> Result<()>;

    /// Deliver one reply chunk.
    async fn reply(&self, content: &str) -> Result<()>;
}

/// Lifecycle management for a messaging channel.
#[async_trait]
pub trait ChannelLifecycle: Send {
    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Start the channel, connecting to the external service.
    async fn connect(&mut self) -> Result<()>;

    /// Gracefully disconnect from the external service.
    async fn disconnect(&mut self) -> Result<()>;

    /// Current connection status.
    fn status(&self) -> ChannelStatus;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}
