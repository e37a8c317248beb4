use std::path::{Path, PathBuf};
use std::str::FromStr;

use splitbot_common::{Error, Result};
use tracing::{info, warn};

use crate::model::{
    AgentConfig, AppConfig, DEFAULT_MCP_CONFIG_PATH, DiscordSettings, LlmProviderConfig,
    ToolProvidersConfig,
};

/// Reads application settings from the environment and the tool provider file.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `.env` (if present) and build the config from process environment.
    pub fn from_env() -> Result<AppConfig> {
        match dotenvy::dotenv() {
            Ok(path) => info!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("failed to read .env file: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = AgentConfig::default();
        let agent = AgentConfig {
            system_prompt: get("SPLITBOT_SYSTEM_PROMPT"),
            max_steps: parse_or(&get, "SPLITBOT_MAX_STEPS", defaults.max_steps)?,
            trigger_keyword: get("SPLITBOT_TRIGGER_KEYWORD")
                .unwrap_or(defaults.trigger_keyword),
            history_limit: parse_or(&get, "SPLITBOT_HISTORY_LIMIT", defaults.history_limit)?,
            lookback_secs: parse_or(&get, "SPLITBOT_LOOKBACK_SECS", defaults.lookback_secs)?,
            typing_interval_secs: parse_or(
                &get,
                "SPLITBOT_TYPING_INTERVAL_SECS",
                defaults.typing_interval_secs,
            )?,
            tool_timeout_secs: parse_or(
                &get,
                "SPLITBOT_TOOL_TIMEOUT_SECS",
                defaults.tool_timeout_secs,
            )?,
            connect_timeout_secs: parse_or(
                &get,
                "SPLITBOT_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            shutdown_timeout_secs: parse_or(
                &get,
                "SPLITBOT_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            )?,
            tool_tags: get("SPLITBOT_TOOL_TAGS").map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            }),
        };

        if agent.max_steps == 0 {
            return Err(Error::Config("SPLITBOT_MAX_STEPS must be at least 1".into()));
        }
        if agent.typing_interval_secs == 0 {
            return Err(Error::Config(
                "SPLITBOT_TYPING_INTERVAL_SECS must be at least 1".into(),
            ));
        }

        let llm_defaults = LlmProviderConfig::default();
        let llm = LlmProviderConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL"),
            model: get("OPENAI_MODEL").unwrap_or(llm_defaults.model),
            max_tokens: get("OPENAI_MAX_TOKENS")
                .map(|raw| {
                    raw.parse()
                        .map_err(|e| Error::Config(format!("invalid OPENAI_MAX_TOKENS: {e}")))
                })
                .transpose()?,
        };

        Ok(AppConfig {
            discord: DiscordSettings {
                bot_token: get("DISCORD_BOT_TOKEN"),
            },
            llm,
            agent,
            mcp_config_path: get("SPLITBOT_MCP_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MCP_CONFIG_PATH)),
        })
    }

    /// Read the tool provider file. A missing file means "no remote providers".
    pub fn load_providers(path: &Path) -> Result<ToolProvidersConfig> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "tool provider config {} not found, starting without remote tools",
                    path.display()
                );
                return Ok(ToolProvidersConfig::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config: ToolProvidersConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))?;

        for (name, server) in &config.providers {
            if server.command.trim().is_empty() {
                return Err(Error::Config(format!(
                    "tool provider '{name}' has an empty command"
                )));
            }
        }

        info!(
            "loaded {} tool provider(s) from {}",
            config.providers.len(),
            path.display()
        );
        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {key}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ConfigLoader::from_lookup(lookup(&[])).expect("defaults should load");
        assert!(config.discord.bot_token.is_none());
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.mcp_config_path, PathBuf::from("mcp-config.json"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ConfigLoader::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "token"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4.1"),
            ("SPLITBOT_MAX_STEPS", "8"),
            ("SPLITBOT_TRIGGER_KEYWORD", "robo"),
            ("SPLITBOT_TOOL_TAGS", "gcp, github,,"),
            ("SPLITBOT_MCP_CONFIG", "/etc/splitbot/tools.json"),
        ]))
        .expect("should load");

        assert_eq!(config.discord.bot_token.as_deref(), Some("token"));
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.agent.max_steps, 8);
        assert_eq!(config.agent.trigger_keyword, "robo");
        assert_eq!(
            config.agent.tool_tags,
            Some(vec!["gcp".to_string(), "github".to_string()])
        );
        assert_eq!(
            config.mcp_config_path,
            PathBuf::from("/etc/splitbot/tools.json")
        );
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = ConfigLoader::from_lookup(lookup(&[("DISCORD_BOT_TOKEN", "   ")]))
            .expect("should load");
        assert!(config.discord.bot_token.is_none());
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = ConfigLoader::from_lookup(lookup(&[("SPLITBOT_MAX_STEPS", "many")]))
            .expect_err("should fail");
        assert!(err.to_string().contains("SPLITBOT_MAX_STEPS"));

        let err = ConfigLoader::from_lookup(lookup(&[("SPLITBOT_MAX_STEPS", "0")]))
            .expect_err("zero steps should fail");
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn missing_provider_file_yields_empty_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ConfigLoader::load_providers(&dir.path().join("absent.json"))
            .expect("missing file is not an error");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn provider_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"mcpServers": {{"github": {{"command": "gh-mcp", "tags": ["code"]}}}}}}"#
        )
        .expect("write");

        let config = ConfigLoader::load_providers(file.path()).expect("should parse");
        assert_eq!(config.providers["github"].command, "gh-mcp");
    }

    #[test]
    fn malformed_provider_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{ not json").expect("write");

        let err = ConfigLoader::load_providers(file.path()).expect_err("should fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"providers": {{"x": {{"command": " "}}}}}}"#).expect("write");

        let err = ConfigLoader::load_providers(file.path()).expect_err("should fail");
        assert!(err.to_string().contains("empty command"));
    }
}
