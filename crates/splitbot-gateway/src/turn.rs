use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use splitbot_agents::{AgentRuntime, ChatMessage};
use splitbot_channels::{
    DISCORD_MESSAGE_LIMIT, ReplyTransport, TypingHeartbeat, evaluate, split_message,
};
use splitbot_common::{InboundMessage, Result};
use splitbot_config::AgentConfig;
use tracing::{error, info, instrument, warn};

use crate::context::ContextWindow;

/// Sent when a triggered turn cannot be completed.
pub const APOLOGY_REPLY: &str = "Sorry, I ran into an error while processing your message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The message did not warrant a reply.
    Ignored,
    /// The reply was delivered in `chunks` messages.
    Replied { chunks: usize },
    /// Generation or delivery failed; an apology was attempted.
    Failed,
}

/// Runs the reply pipeline for inbound messages.
pub struct TurnHandler {
    runtime: Arc<AgentRuntime>,
    keyword: String,
    window: ContextWindow,
    typing_interval: Duration,
    max_chunk_len: usize,
}

impl TurnHandler {
    pub fn new(runtime: Arc<AgentRuntime>, config: &AgentConfig) -> Self {
        Self {
            runtime,
            keyword: config.trigger_keyword.clone(),
            window: ContextWindow::from(config),
            typing_interval: Duration::from_secs(config.typing_interval_secs),
            max_chunk_len: DISCORD_MESSAGE_LIMIT,
        }
    }

    pub fn with_max_chunk_len(mut self, max_chunk_len: usize) -> Self {
        self.max_chunk_len = max_chunk_len;
        self
    }

    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    /// Answer `msg` if it is addressed to the bot.
    #[instrument(skip_all, fields(message_id = %msg.id, channel = %msg.channel_id))]
    pub async fn handle(
        &self,
        msg: &InboundMessage,
        transport: Arc<dyn ReplyTransport>,
    ) -> TurnOutcome {
        let Some(reason) = evaluate(msg, &self.keyword) else {
            return TurnOutcome::Ignored;
        };
        info!(author = %msg.author.name, %reason, "received message addressed to the bot");

        match self.respond(msg, Arc::clone(&transport)).await {
            Ok(chunks) => TurnOutcome::Replied { chunks },
            Err(e) => {
                error!("failed to process message: {e}");
                if let Err(e) = transport.reply(APOLOGY_REPLY).await {
                    warn!("failed to send apology: {e}");
                }
                TurnOutcome::Failed
            }
        }
    }

    async fn respond(
        &self,
        msg: &InboundMessage,
        transport: Arc<dyn ReplyTransport>,
    ) -> Result<usize> {
        let history = transport.fetch_history(self.window.limit).await?;
        let mut conversation = self
            .window
            .build(history, transport.bot_user_id(), Utc::now());
        if conversation.is_empty() {
            conversation.push(ChatMessage::user(format!(
                "{}: {}",
                msg.author.name, msg.content
            )));
        }
        info!(
            "generating reply with {} context message(s)",
            conversation.len()
        );

        let mut typing = TypingHeartbeat::start(Arc::clone(&transport), self.typing_interval);
        let reply = self.runtime.run_turn(conversation).await;
        typing.stop();
        let reply = reply?;

        let chunks = split_message(&reply, self.max_chunk_len);
        for chunk in &chunks {
            transport.reply(chunk).await?;
        }
        Ok(chunks.len())
    }
}
