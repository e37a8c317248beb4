use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use splitbot_common::{Error, Result};
use splitbot_config::{AgentConfig, ToolProvidersConfig};
use tracing::{debug, info, instrument, warn};

use crate::mcp::{Connector, McpManager, ProviderStatus, StdioConnector};
use crate::providers::ToolDefinition;
use crate::schema::Validator;
use crate::tools::{SkillTool, Tool, sanitize};

/// Timeouts applied to remote providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    pub connect_timeout: Duration,
    pub tool_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&AgentConfig> for RegistryOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: Validator,
    /// `None` for in-process tools.
    provider: Option<String>,
    tags: Vec<String>,
}

/// Every tool the model may call, keyed by registry name.
///
/// Built once at startup and shared behind an `Arc`; lookups and dispatch
/// take `&self`.
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
    manager: McpManager,
    options: RegistryOptions,
}

impl ToolRegistry {
    /// An empty registry with no providers.
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            tools: BTreeMap::new(),
            manager: McpManager::with_connector(Arc::new(StdioConnector)),
            options,
        }
    }

    /// Register the in-process tools, then connect every enabled provider
    /// from `config` and register what they expose.
    pub async fn start(
        config: &ToolProvidersConfig,
        local_tools: Vec<Arc<dyn Tool>>,
        options: RegistryOptions,
    ) -> Self {
        Self::start_with(Arc::new(StdioConnector), config, local_tools, options).await
    }

    /// Like [`ToolRegistry::start`], with a custom way of opening connections.
    pub async fn start_with(
        connector: Arc<dyn Connector>,
        config: &ToolProvidersConfig,
        local_tools: Vec<Arc<dyn Tool>>,
        options: RegistryOptions,
    ) -> Self {
        let mut registry = Self {
            tools: BTreeMap::new(),
            manager: McpManager::with_connector(connector),
            options,
        };

        for tool in local_tools {
            registry.register_local(tool).await;
        }

        let connected = registry
            .manager
            .connect_all(config, options.connect_timeout)
            .await;
        for provider in connected {
            for tool in registry
                .manager
                .take_tools(&provider, options.tool_timeout)
                .await
            {
                registry.insert(tool, Some(provider.clone()));
            }
        }

        info!(
            "tool registry ready: {} tool(s) from {} provider(s)",
            registry.tools.len(),
            registry.manager.list_servers().await.len()
        );
        registry
    }

    /// Register an in-process tool and, when it publishes one, its skill
    /// companion. Returns `false` when the name was already taken.
    pub async fn register_local(&mut self, tool: Arc<dyn Tool>) -> bool {
        let skill = tool.skill().await.filter(|s| !s.trim().is_empty());
        let name = tool.name().to_string();
        let tags = tool.tags();

        if !self.insert(tool, None) {
            return false;
        }
        if let Some(text) = skill {
            self.insert(Arc::new(SkillTool::new(&name, text, tags)), None);
        }
        true
    }

    fn insert(&mut self, tool: Arc<dyn Tool>, provider: Option<String>) -> bool {
        let name = tool.name().to_string();
        if let Some(existing) = self.tools.get(&name) {
            warn!(
                "tool '{name}' from {} is already registered by {}, skipping",
                provider.as_deref().unwrap_or("in-process"),
                existing.provider.as_deref().unwrap_or("in-process"),
            );
            return false;
        }

        debug!("registered tool '{name}'");
        let entry = RegisteredTool {
            validator: tool.validator(),
            tags: tool.tags(),
            tool,
            provider,
        };
        self.tools.insert(name, entry);
        true
    }

    /// Definitions to offer the model, sorted by name.
    ///
    /// With `tags`, only tools sharing at least one tag are listed.
    pub fn list_definitions(&self, tags: Option<&[String]>) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|(_, entry)| match tags {
                Some(wanted) => entry.tags.iter().any(|t| wanted.contains(t)),
                None => true,
            })
            .map(|(name, entry)| ToolDefinition {
                name: name.clone(),
                description: entry.tool.description().to_string(),
                input_schema: entry.tool.input_schema(),
            })
            .collect()
    }

    /// Validate `raw_args` and run the named tool.
    #[instrument(skip(self, raw_args))]
    pub async fn dispatch(&self, name: &str, raw_args: Value) -> Result<Value> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let raw_args = match raw_args {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let args = entry
            .validator
            .validate(&raw_args)
            .map_err(|e| Error::InvalidArguments {
                tool: name.to_string(),
                reason: e.to_string(),
            })?;

        debug!(provider = ?entry.provider, "executing tool");
        entry
            .tool
            .execute(sanitize(&args))
            .await
            .map_err(|e| Error::tool_execution(name, e))
    }

    /// Close every provider connection. Never fails.
    pub async fn shutdown(&self) {
        self.manager
            .disconnect_all(self.options.shutdown_timeout)
            .await;
        info!("tool registry shut down");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Which provider registered `name`, `None` for in-process tools.
    pub fn provider_of(&self, name: &str) -> Option<&str> {
        self.tools.get(name).and_then(|e| e.provider.as_deref())
    }

    pub async fn providers(&self) -> Vec<ProviderStatus> {
        self.manager.list_servers().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        calls: Arc<AtomicUsize>,
        skill: Option<&'static str>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"},
                    "times": {"type": "integer"}
                },
                "required": ["message"],
                "additionalProperties": false
            })
        }

        fn tags(&self) -> Vec<String> {
            vec!["util".into()]
        }

        async fn execute(&self, args: Value) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if args["message"] == "boom" {
                return Err(Error::Mcp("exploded".into()));
            }
            Ok(args)
        }

        async fn skill(&self) -> Option<String> {
            self.skill.map(str::to_string)
        }
    }

    async fn registry_with(skill: Option<&'static str>) -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = EchoTool {
            calls: Arc::clone(&calls),
            skill,
        };
        let registry = ToolRegistry::start(
            &ToolProvidersConfig::default(),
            vec![Arc::new(tool)],
            RegistryOptions::default(),
        )
        .await;
        (registry, calls)
    }

    #[tokio::test]
    async fn dispatch_validates_and_normalizes_arguments() {
        let (registry, calls) = registry_with(None).await;

        let out = registry
            .dispatch("echo", json!({"message": "hi", "times": 2.0}))
            .await
            .unwrap();
        assert_eq!(out, json!({"message": "hi", "times": 2}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let (registry, _) = registry_with(None).await;
        let err = registry.dispatch("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(ref n) if n == "nope"));
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_tool() {
        let (registry, calls) = registry_with(None).await;
        for bad in [json!({}), json!({"message": 3}), json!({"message": "x", "extra": 1})] {
            let err = registry.dispatch("echo", bad).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArguments { .. }), "{err}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn execution_failures_are_wrapped() {
        let (registry, _) = registry_with(None).await;
        let err = registry
            .dispatch("echo", json!({"message": "boom"}))
            .await
            .unwrap_err();
        match err {
            Error::ToolExecution { tool, source } => {
                assert_eq!(tool, "echo");
                assert_eq!(source.to_string(), "mcp error: exploded");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn skill_companion_is_registered() {
        let (registry, _) = registry_with(Some("say things")).await;
        assert_eq!(registry.tool_names(), vec!["echo", "skill_echo"]);
        assert_eq!(
            registry.dispatch("skill_echo", Value::Null).await.unwrap(),
            json!("say things")
        );

        let (without, _) = registry_with(Some("  ")).await;
        assert_eq!(without.tool_names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn duplicate_names_keep_the_first_registration() {
        let (mut registry, first_calls) = registry_with(None).await;
        let second_calls = Arc::new(AtomicUsize::new(0));
        let accepted = registry
            .register_local(Arc::new(EchoTool {
                calls: Arc::clone(&second_calls),
                skill: None,
            }))
            .await;

        assert!(!accepted);
        assert_eq!(registry.len(), 1);
        registry.dispatch("echo", json!({"message": "x"})).await.unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn definitions_are_filtered_by_tag() {
        let (registry, _) = registry_with(Some("notes")).await;
        assert_eq!(registry.list_definitions(None).len(), 2);
        assert_eq!(registry.list_definitions(Some(&["util".into()])).len(), 2);
        assert!(registry.list_definitions(Some(&["gcp".into()])).is_empty());
    }

    #[tokio::test]
    async fn empty_registry_shuts_down_cleanly() {
        let registry = ToolRegistry::new(RegistryOptions::default());
        assert!(registry.is_empty());
        assert!(registry.providers().await.is_empty());
        registry.shutdown().await;
    }
}
