use std::time::Duration;

use chrono::{DateTime, Utc};
use splitbot_agents::ChatMessage;
use splitbot_common::{HistoryMessage, UserId};
use splitbot_config::AgentConfig;

/// Bounds on the channel history handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    /// Maximum number of messages fetched and kept.
    pub limit: usize,
    /// Messages older than this are left out.
    pub lookback: Duration,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            limit: 100,
            lookback: Duration::from_secs(3 * 60 * 60),
        }
    }
}

impl From<&AgentConfig> for ContextWindow {
    fn from(config: &AgentConfig) -> Self {
        Self {
            limit: config.history_limit,
            lookback: Duration::from_secs(config.lookback_secs),
        }
    }
}

impl ContextWindow {
    /// Turn raw channel history into the conversation for one turn.
    ///
    /// Keeps messages newer than the lookback, drops other bots, orders them
    /// oldest first and keeps the most recent `limit`. The bot's own messages
    /// become assistant turns; everyone else's become `"{name}: {text}"`
    /// user turns.
    pub fn build(
        &self,
        history: Vec<HistoryMessage>,
        bot_id: &UserId,
        now: DateTime<Utc>,
    ) -> Vec<ChatMessage> {
        let lookback = chrono::Duration::from_std(self.lookback).unwrap_or(chrono::Duration::MAX);
        let cutoff = now.checked_sub_signed(lookback).unwrap_or(DateTime::<Utc>::MIN_UTC);

        // History arrives newest first; reverse before the stable sort so
        // messages sharing a timestamp keep their channel order.
        let mut kept: Vec<HistoryMessage> = history
            .into_iter()
            .rev()
            .filter(|m| m.created_at > cutoff)
            .filter(|m| !m.author.is_bot || &m.author.id == bot_id)
            .collect();
        kept.sort_by_key(|m| m.created_at);

        let skip = kept.len().saturating_sub(self.limit);
        kept.into_iter()
            .skip(skip)
            .map(|m| {
                if &m.author.id == bot_id {
                    ChatMessage::assistant(m.content)
                } else {
                    ChatMessage::user(format!("{}: {}", m.author.name, m.content))
                }
            })
            .collect()
    }
}
