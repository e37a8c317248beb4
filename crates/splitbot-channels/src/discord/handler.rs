use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use serenity::all::{
    self as serenity_model, Context, EventHandler, Message as SerenityMessage, Ready,
};
use splitbot_common::{InboundMessage, UserId};
use tracing::{debug, info, warn};

use super::convert;
use super::transport::DiscordTransport;
use crate::traits::{ChannelStatus, ReplyTransport};

/// Callback invoked for every non-bot message, on its own task.
pub type MessageCallback = Arc<
    dyn Fn(InboundMessage, Arc<dyn ReplyTransport>) -> Pin<Box<dyn Future<Output = ()> + Send>>
        + Send
        + Sync,
>;

/// Serenity event handler that hands Discord messages to the turn pipeline.
pub struct DiscordHandler {
    on_message: MessageCallback,
    status: Arc<std::sync::Mutex<ChannelStatus>>,
    bot_id: OnceLock<serenity_model::UserId>,
}

impl DiscordHandler {
    pub fn new(on_message: MessageCallback, status: Arc<std::sync::Mutex<ChannelStatus>>) -> Self {
        Self {
            on_message,
            status,
            bot_id: OnceLock::new(),
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }

    async fn mentions_bot_role(
        ctx: &Context,
        msg: &SerenityMessage,
        bot_id: serenity_model::UserId,
    ) -> bool {
        if msg.mention_roles.is_empty() {
            return false;
        }
        let Some(guild_id) = msg.guild_id else {
            return false;
        };
        match guild_id.member(ctx, bot_id).await {
            Ok(member) => convert::mentions_any_role(&msg.mention_roles, &member.roles),
            Err(e) => {
                warn!("failed to resolve bot roles in guild {guild_id}: {e}");
                false
            }
        }
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    /// Fired when the bot successfully connects and is ready.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {} (guilds: {})",
            ready.user.name,
            ready.guilds.len()
        );
        let _ = self.bot_id.set(ready.user.id);
        self.set_status(ChannelStatus::Connected);
    }

    /// Fired when the bot resumes a previously interrupted gateway connection.
    async fn resume(&self, _ctx: Context, _: serenity_model::ResumedEvent) {
        info!("Discord gateway connection resumed");
        self.set_status(ChannelStatus::Connected);
    }

    /// Fired when a message is received in any channel the bot can see.
    async fn message(&self, ctx: Context, msg: SerenityMessage) {
        // Ignore messages from bots (including ourselves) to prevent loops
        if msg.author.bot {
            return;
        }

        let bot_id = match self.bot_id.get() {
            Some(id) => *id,
            None => ctx.cache.current_user().id,
        };

        let role_mentioned = Self::mentions_bot_role(&ctx, &msg, bot_id).await;
        let inbound = convert::to_inbound(&msg, bot_id, role_mentioned);

        debug!(
            message_id = %msg.id,
            author = %msg.author.name,
            channel = %msg.channel_id,
            "received discord message"
        );

        let transport: Arc<dyn ReplyTransport> = Arc::new(DiscordTransport::new(
            ctx,
            msg,
            UserId::from_string(bot_id.to_string()),
        ));
        let callback = Arc::clone(&self.on_message);
        tokio::spawn(async move {
            callback(inbound, transport).await;
        });
    }
}
