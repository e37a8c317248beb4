use async_trait::async_trait;
use serenity::all::{Context, GetMessages, Message as SerenityMessage};
use splitbot_common::{Error, HistoryMessage, Result, UserId};

use super::convert;
use crate::traits::ReplyTransport;

/// Discord caps a single history page at 100 messages.
const MAX_HISTORY_PAGE: usize = 100;

/// Replies to one Discord message in the channel it was posted in.
pub struct DiscordTransport {
    ctx: Context,
    message: SerenityMessage,
    bot_id: UserId,
}

impl DiscordTransport {
    pub fn new(ctx: Context, message: SerenityMessage, bot_id: UserId) -> Self {
        Self {
            ctx,
            message,
            bot_id,
        }
    }
}

#[async_trait]
impl ReplyTransport for DiscordTransport {
    fn bot_user_id(&self) -> &UserId {
        &self.bot_id
    }

    async fn fetch_history(&self, limit: usize) -> Result<Vec<HistoryMessage>> {
        let page = limit.clamp(1, MAX_HISTORY_PAGE) as u8;
        let messages = self
            .message
            .channel_id
            .messages(&self.ctx, GetMessages::new().limit(page))
            .await
            .map_err(|e| Error::Channel(format!("failed to fetch channel history: {e}")))?;
        Ok(messages.iter().map(convert::to_history).collect())
    }

    async fn send_typing(&self) -> Result<()> {
        self.message
            .channel_id
            .broadcast_typing(&self.ctx.http)
            .await
            .map_err(|e| Error::Channel(format!("failed to send typing: {e}")))
    }

    async fn reply(&self, content: &str) -> Result<()> {
        self.message
            .reply(&self.ctx, content)
            .await
            .map_err(|e| Error::Channel(format!("failed to send discord reply: {e}")))?;
        Ok(())
    }
}
