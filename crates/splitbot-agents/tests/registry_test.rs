use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use splitbot_agents::{Connector, McpToolInfo, RegistryOptions, ToolConnection, ToolRegistry};
use splitbot_common::{Error, Result};
use splitbot_config::{McpServerConfig, ToolProvidersConfig};

type CallLog = Arc<Mutex<Vec<(String, String, Value)>>>;

struct FakeServer {
    name: String,
    log: CallLog,
    delay: Duration,
}

#[async_trait]
impl ToolConnection for FakeServer {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        Ok(vec![
            McpToolInfo {
                name: "search".into(),
                description: Some(format!("Search {}", self.name)),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "limit": {"type": "integer"},
                        "filters": {
                            "type": "object",
                            "properties": {"since": {"type": "string"}}
                        }
                    },
                    "required": ["query"]
                }),
            },
            McpToolInfo {
                name: "drop_everything".into(),
                description: None,
                input_schema: json!({}),
            },
        ])
    }

    async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value> {
        tokio::time::sleep(self.delay).await;
        let args = Value::Object(arguments.unwrap_or_default());
        self.log
            .lock()
            .unwrap()
            .push((self.name.clone(), name.to_string(), args));
        if self.name == "flaky" {
            return Err(Error::Mcp("connection reset".into()));
        }
        Ok(json!({"content": [{"type": "text", "text": format!("{} results", self.name)}]}))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

struct FakeConnector {
    log: CallLog,
    delay: Duration,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        name: &str,
        config: &McpServerConfig,
    ) -> Result<Arc<dyn ToolConnection>> {
        if config.command == "missing-binary" {
            return Err(Error::ProviderConnect {
                provider: name.into(),
                reason: "No such file or directory".into(),
            });
        }
        Ok(Arc::new(FakeServer {
            name: name.into(),
            log: Arc::clone(&self.log),
            delay: self.delay,
        }))
    }
}

fn provider(command: &str, tags: &[&str]) -> McpServerConfig {
    McpServerConfig {
        command: command.into(),
        disabled_tools: vec!["drop_everything".into()],
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

async fn start(delay: Duration) -> (ToolRegistry, CallLog) {
    let mut config = ToolProvidersConfig::default();
    config
        .providers
        .insert("github".into(), provider("gh-mcp", &["code"]));
    config
        .providers
        .insert("gcp".into(), provider("gcp-mcp", &["logs"]));
    config
        .providers
        .insert("flaky".into(), provider("flaky-mcp", &[]));
    config
        .providers
        .insert("ghost".into(), provider("missing-binary", &[]));

    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let connector = FakeConnector {
        log: Arc::clone(&log),
        delay,
    };
    let registry = ToolRegistry::start_with(
        Arc::new(connector),
        &config,
        Vec::new(),
        RegistryOptions::default(),
    )
    .await;
    (registry, log)
}

#[tokio::test]
async fn remote_tools_are_namespaced_and_filtered() {
    let (registry, _) = start(Duration::ZERO).await;

    assert_eq!(
        registry.tool_names(),
        vec!["flaky___search", "gcp___search", "github___search"]
    );
    assert_eq!(registry.provider_of("gcp___search"), Some("gcp"));

    let providers = registry.providers().await;
    let names: Vec<_> = providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["flaky", "gcp", "github"]);
    assert!(providers.iter().all(|p| p.tool_count == 1 && p.connected));

    let logs_only = registry.list_definitions(Some(&["logs".to_string()]));
    assert_eq!(logs_only.len(), 1);
    assert_eq!(logs_only[0].name, "gcp___search");
    assert_eq!(logs_only[0].description, "Search gcp");
}

#[tokio::test]
async fn dispatch_routes_to_the_owning_provider_with_original_name() {
    let (registry, log) = start(Duration::ZERO).await;

    let result = registry
        .dispatch(
            "gcp___search",
            json!({"query": "5xx", "limit": 10.0, "filters": {"since": null}}),
        )
        .await
        .unwrap();
    assert_eq!(result["content"][0]["text"], "gcp results");

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    let (server, tool, args) = &log[0];
    assert_eq!(server, "gcp");
    assert_eq!(tool, "search");
    // The null filter leaves `filters` empty, so it is not forwarded at all.
    assert_eq!(args, &json!({"query": "5xx", "limit": 10}));
}

#[tokio::test]
async fn provider_failures_surface_as_tool_execution_errors() {
    let (registry, _) = start(Duration::ZERO).await;

    let err = registry
        .dispatch("flaky___search", json!({"query": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ToolExecution { ref tool, .. } if tool == "flaky___search"));
    assert!(err.to_string().contains("connection reset"));

    let err = registry
        .dispatch("ghost___search", json!({"query": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ToolNotFound(_)));
}

#[tokio::test]
async fn disabled_tools_cannot_be_dispatched() {
    let (registry, log) = start(Duration::ZERO).await;

    let err = registry
        .dispatch("github___drop_everything", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ToolNotFound(ref n) if n == "github___drop_everything"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_dispatch_is_not_serialized() {
    let delay = Duration::from_millis(100);
    let (registry, log) = start(delay).await;
    let registry = Arc::new(registry);

    let began = Instant::now();
    let calls = (0..5).map(|i| {
        let registry = Arc::clone(&registry);
        async move {
            registry
                .dispatch("github___search", json!({"query": format!("q{i}")}))
                .await
        }
    });
    let results = futures::future::join_all(calls).await;
    let elapsed = began.elapsed();

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(log.lock().unwrap().len(), 5);
    // Sequential execution would take 5 * delay; allow generous slack.
    assert!(elapsed < delay * 5 / 2, "took {elapsed:?}");

    registry.shutdown().await;
    assert!(registry.providers().await.is_empty());
}
