pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    AgentConfig, AppConfig, DEFAULT_SYSTEM_PROMPT, DiscordSettings, LlmProviderConfig,
    McpServerConfig, ToolProvidersConfig,
};
