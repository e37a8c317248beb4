use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub const DEFAULT_MCP_CONFIG_PATH: &str = "mcp-config.json";
pub const DEFAULT_TRIGGER_KEYWORD: &str = "splitc";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Used when `SPLITBOT_SYSTEM_PROMPT` is unset.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are SplitBot, a helpful Discord bot. \
Answer questions using the context of the recent channel messages. \
Be concise, direct and friendly. \
You can call tools; when you do, wait for the result and explain what it means.";

/// Top-level runtime configuration, assembled from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord: DiscordSettings,
    pub llm: LlmProviderConfig,
    pub agent: AgentConfig,
    pub mcp_config_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct DiscordSettings {
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
        }
    }
}

/// Knobs for the conversation loop and the reply pipeline around it.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub system_prompt: Option<String>,
    /// Upper bound on model/tool round trips within one turn.
    pub max_steps: usize,
    pub trigger_keyword: String,
    /// How many channel messages are fetched for the context window.
    pub history_limit: usize,
    pub lookback_secs: u64,
    pub typing_interval_secs: u64,
    pub tool_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    /// When set, only tools carrying one of these tags are offered to the model.
    pub tool_tags: Option<Vec<String>>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_steps: 5,
            trigger_keyword: DEFAULT_TRIGGER_KEYWORD.to_string(),
            history_limit: 100,
            lookback_secs: 3 * 60 * 60,
            typing_interval_secs: 5,
            tool_timeout_secs: 60,
            connect_timeout_secs: 30,
            shutdown_timeout_secs: 5,
            tool_tags: None,
        }
    }
}

/// Contents of the tool provider file (`mcp-config.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolProvidersConfig {
    #[serde(default, alias = "mcpServers")]
    pub providers: BTreeMap<String, McpServerConfig>,
}

impl ToolProvidersConfig {
    /// Providers that should be connected at startup, in name order.
    pub fn enabled(&self) -> impl Iterator<Item = (&String, &McpServerConfig)> {
        self.providers.iter().filter(|(_, cfg)| !cfg.disabled)
    }
}

/// Launch command and filtering rules for one subprocess tool server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub disabled_tools: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Handshake timeout override for slow-starting servers.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl McpServerConfig {
    pub fn is_tool_disabled(&self, tool_name: &str) -> bool {
        self.disabled_tools.iter().any(|t| t == tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_provider_file_with_defaults() {
        let config: ToolProvidersConfig = serde_json::from_value(json!({
            "providers": {
                "github": {
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-github"],
                    "env": {"GITHUB_TOKEN": "t"},
                    "disabledTools": ["delete_repository"],
                    "tags": ["code"]
                },
                "gcp": { "command": "gcp-mcp", "disabled": true }
            }
        }))
        .expect("should parse");

        let github = &config.providers["github"];
        assert_eq!(github.args.len(), 2);
        assert_eq!(github.env["GITHUB_TOKEN"], "t");
        assert!(github.is_tool_disabled("delete_repository"));
        assert!(!github.is_tool_disabled("list_commits"));
        assert_eq!(github.tags, vec!["code".to_string()]);

        let gcp = &config.providers["gcp"];
        assert!(gcp.disabled);
        assert!(gcp.args.is_empty());
        assert!(gcp.timeout_secs.is_none());
    }

    #[test]
    fn accepts_mcp_servers_alias() {
        let config: ToolProvidersConfig = serde_json::from_value(json!({
            "mcpServers": { "fs": { "command": "fs-mcp" } }
        }))
        .expect("should parse alias");
        assert!(config.providers.contains_key("fs"));
    }

    #[test]
    fn enabled_skips_disabled_providers() {
        let mut config = ToolProvidersConfig::default();
        config.providers.insert(
            "a".into(),
            McpServerConfig {
                command: "a".into(),
                ..Default::default()
            },
        );
        config.providers.insert(
            "b".into(),
            McpServerConfig {
                command: "b".into(),
                disabled: true,
                ..Default::default()
            },
        );

        let names: Vec<_> = config.enabled().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn agent_defaults_match_reply_pipeline_expectations() {
        let agent = AgentConfig::default();
        assert_eq!(agent.max_steps, 5);
        assert_eq!(agent.lookback_secs, 10_800);
        assert_eq!(agent.typing_interval_secs, 5);
        assert_eq!(agent.trigger_keyword, "splitc");
    }
}
