pub mod split;
pub mod traits;
pub mod trigger;
pub mod typing;

#[cfg(feature = "discord")]
pub mod discord;

pub use split::{DISCORD_MESSAGE_LIMIT, split_message};
pub use traits::{ChannelLifecycle, ChannelStatus, ReplyTransport};
pub use trigger::{TriggerReason, evaluate};
pub use typing::TypingHeartbeat;

#[cfg(feature = "discord")]
pub use discord::{DiscordChannel, DiscordConfig, MessageCallback};
