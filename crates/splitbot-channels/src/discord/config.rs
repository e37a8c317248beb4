use serenity::all::GatewayIntents;
use splitbot_common::{Error, Result};

/// Connection settings for the Discord gateway.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token for authenticating with Discord.
    pub bot_token: String,

    /// Gateway intents to request from Discord.
    pub intents: GatewayIntents,
}

impl DiscordConfig {
    /// Build the config from an optional token, as read from the environment.
    pub fn from_token(token: Option<String>) -> Result<Self> {
        let bot_token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("DISCORD_BOT_TOKEN is required".into()))?;

        // GUILD_MESSAGES + MESSAGE_CONTENT to read server channels, DIRECT_MESSAGES for DMs.
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        Ok(Self { bot_token, intents })
    }
}
