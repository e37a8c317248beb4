mod config;
pub mod convert;
mod handler;
mod transport;

pub use config::DiscordConfig;
pub use handler::{DiscordHandler, MessageCallback};
pub use transport::DiscordTransport;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serenity::Client;
use serenity::gateway::ShardManager;
use splitbot_common::{Error, Result};
use tracing::{error, info};

use crate::traits::{ChannelLifecycle, ChannelStatus};

/// Discord gateway connection feeding messages to a callback.
pub struct DiscordChannel {
    config: DiscordConfig,
    on_message: MessageCallback,
    status: Arc<Mutex<ChannelStatus>>,
    shard_manager: Option<Arc<ShardManager>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig, on_message: MessageCallback) -> Self {
        Self {
            config,
            on_message,
            status: Arc::new(Mutex::new(ChannelStatus::Disconnected)),
            shard_manager: None,
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }
}

#[async_trait]
impl ChannelLifecycle for DiscordChannel {
    fn display_name(&self) -> &str {
        "Discord"
    }

    async fn connect(&mut self) -> Result<()> {
        self.set_status(ChannelStatus::Connecting);

        let handler = DiscordHandler::new(Arc::clone(&self.on_message), Arc::clone(&self.status));
        let mut client = Client::builder(&self.config.bot_token, self.config.intents)
            .event_handler(handler)
            .await
            .map_err(|e| Error::Channel(format!("failed to create discord client: {e}")))?;

        self.shard_manager = Some(Arc::clone(&client.shard_manager));

        let status = Arc::clone(&self.status);
        tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!("discord client stopped with error: {e}");
                *status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                    ChannelStatus::Error(e.to_string());
            }
        });

        info!("discord channel starting");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(manager) = self.shard_manager.take() {
            manager.shutdown_all().await;
            info!("discord channel disconnected");
        }
        self.set_status(ChannelStatus::Disconnected);
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
