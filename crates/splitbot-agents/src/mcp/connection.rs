use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParams;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde_json::{Map, Value, json};
use splitbot_common::{Error, Result};
use splitbot_config::McpServerConfig;
use tokio::process::Command;

/// Cached info about a tool discovered from an MCP server.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// An open session with one tool server.
///
/// Implementations must allow concurrent `call_tool` invocations.
#[async_trait]
pub trait ToolConnection: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>>;

    /// Invoke `name` (the server's own tool name) and return the raw result.
    async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value>;

    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Opens connections to tool servers described in the provider file.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, name: &str, config: &McpServerConfig)
    -> Result<Arc<dyn ToolConnection>>;
}

/// Spawns the configured command and speaks MCP over its stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioConnector;

#[async_trait]
impl Connector for StdioConnector {
    async fn connect(
        &self,
        name: &str,
        config: &McpServerConfig,
    ) -> Result<Arc<dyn ToolConnection>> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        for (k, v) in &config.env {
            cmd.env(k, v);
        }

        let transport = TokioChildProcess::new(cmd).map_err(|e| Error::ProviderConnect {
            provider: name.to_string(),
            reason: format!("failed to spawn '{}': {e}", config.command),
        })?;

        let service = ().serve(transport).await.map_err(|e| Error::ProviderConnect {
            provider: name.to_string(),
            reason: format!("handshake failed: {e}"),
        })?;

        Ok(Arc::new(RmcpConnection::new(name, service)))
    }
}

/// [`ToolConnection`] backed by an rmcp client session.
pub struct RmcpConnection {
    server_name: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl RmcpConnection {
    pub fn new(server_name: &str, service: RunningService<RoleClient, ()>) -> Self {
        Self {
            server_name: server_name.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }

    fn take_service(&self) -> Option<RunningService<RoleClient, ()>> {
        self.service
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

#[async_trait]
impl ToolConnection for RmcpConnection {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        let name = &self.server_name;
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| Error::Mcp(format!("failed to list tools from '{name}': {e}")))?;

        Ok(tools
            .into_iter()
            .map(|t| McpToolInfo {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: serde_json::to_value(&*t.input_schema).unwrap_or_default(),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value> {
        let params: CallToolRequestParams =
            serde_json::from_value(json!({ "name": name, "arguments": arguments }))?;

        let result = self.peer.call_tool(params).await.map_err(|e| {
            Error::Mcp(format!(
                "call to '{name}' on '{}' failed: {e}",
                self.server_name
            ))
        })?;

        Ok(serde_json::to_value(&result)?)
    }

    async fn close(&self) -> Result<()> {
        let Some(service) = self.take_service() else {
            return Ok(());
        };
        service.cancel().await.map_err(|e| {
            Error::Mcp(format!(
                "error cancelling MCP server '{}': {e}",
                self.server_name
            ))
        })?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.service
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_none_or(|service| service.is_closed())
    }
}
