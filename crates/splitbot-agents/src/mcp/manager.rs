use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use splitbot_common::{Error, Result};
use splitbot_config::{McpServerConfig, ToolProvidersConfig};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::connection::{Connector, McpToolInfo, StdioConnector, ToolConnection};
use super::tool_bridge::McpTool;
use crate::tools::Tool;

/// Snapshot of one connected provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub tool_count: usize,
    pub connected: bool,
}

/// A live connection to one MCP server.
struct McpConnection {
    server_name: String,
    connection: Arc<dyn ToolConnection>,
    tools: Vec<McpToolInfo>,
    tags: Vec<String>,
}

/// Manages the lifecycle of MCP server connections.
pub struct McpManager {
    connector: Arc<dyn Connector>,
    connections: Arc<RwLock<HashMap<String, McpConnection>>>,
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new()
    }
}

impl McpManager {
    pub fn new() -> Self {
        Self::with_connector(Arc::new(StdioConnector))
    }

    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Connect to one server and discover its tools.
    ///
    /// The handshake and the initial tool listing share one timeout. Tools
    /// named in `disabledTools` are never exposed. Returns the number of
    /// tools kept.
    pub async fn connect(
        &self,
        name: &str,
        config: &McpServerConfig,
        timeout: Duration,
    ) -> Result<usize> {
        let handshake = async {
            let connection = self.connector.connect(name, config).await?;
            let tools = connection.list_tools().await?;
            Ok::<_, Error>((connection, tools))
        };

        let (connection, discovered) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| Error::ProviderConnect {
                provider: name.to_string(),
                reason: format!("handshake timed out after {}s", timeout.as_secs()),
            })?
            .map_err(|e| match e {
                Error::ProviderConnect { .. } => e,
                other => Error::ProviderConnect {
                    provider: name.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let total = discovered.len();
        let tools: Vec<McpToolInfo> = discovered
            .into_iter()
            .filter(|t| !config.is_tool_disabled(&t.name))
            .collect();

        info!(
            "MCP server '{name}' connected: {} tool(s) discovered, {} disabled",
            total,
            total - tools.len()
        );
        for tool in &tools {
            info!("  -> {name}.{}", tool.name);
        }

        let count = tools.len();
        let conn = McpConnection {
            server_name: name.to_string(),
            connection,
            tools,
            tags: config.tags.clone(),
        };

        if let Some(previous) = self
            .connections
            .write()
            .await
            .insert(name.to_string(), conn)
        {
            warn!("replacing existing connection to MCP server '{name}'");
            if let Err(e) = previous.connection.close().await {
                warn!("error closing previous connection to '{name}': {e}");
            }
        }
        Ok(count)
    }

    /// Connect every enabled provider concurrently.
    ///
    /// Failures are logged and the provider is left out. Returns the names
    /// of the providers that connected.
    pub async fn connect_all(
        &self,
        config: &ToolProvidersConfig,
        default_timeout: Duration,
    ) -> Vec<String> {
        for (name, _) in config.providers.iter().filter(|(_, cfg)| cfg.disabled) {
            info!("MCP server '{name}' is disabled, skipping");
        }

        let attempts = config.enabled().map(|(name, server)| async move {
            let timeout = server
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default_timeout);
            (name.clone(), self.connect(name, server, timeout).await)
        });

        let mut connected = Vec::new();
        for (name, result) in join_all(attempts).await {
            match result {
                Ok(_) => connected.push(name),
                Err(e) => warn!("{e}"),
            }
        }
        connected
    }

    /// Disconnect a specific MCP server.
    pub async fn disconnect(&self, name: &str) {
        if let Some(conn) = self.connections.write().await.remove(name) {
            info!("disconnecting MCP server '{name}'");
            if let Err(e) = conn.connection.close().await {
                warn!("error cancelling MCP server '{name}': {e}");
            }
        }
    }

    /// Disconnect all MCP servers concurrently, each bounded by `timeout`.
    pub async fn disconnect_all(&self, timeout: Duration) {
        let conns: HashMap<String, McpConnection> =
            std::mem::take(&mut *self.connections.write().await);

        let closes = conns.into_values().map(|conn| async move {
            let name = conn.server_name;
            info!("disconnecting MCP server '{name}'");
            match tokio::time::timeout(timeout, conn.connection.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("error cancelling MCP server '{name}': {e}"),
                Err(_) => warn!(
                    "MCP server '{name}' did not close within {}s",
                    timeout.as_secs()
                ),
            }
        });
        join_all(closes).await;
    }

    /// Create `Tool` trait objects for all tools from a specific server.
    /// The tools share the server's connection handle.
    pub async fn take_tools(&self, name: &str, call_timeout: Duration) -> Vec<Arc<dyn Tool>> {
        let conns = self.connections.read().await;
        let Some(conn) = conns.get(name) else {
            return Vec::new();
        };

        conn.tools
            .iter()
            .map(|t| {
                Arc::new(McpTool::new(
                    &conn.server_name,
                    t,
                    conn.tags.clone(),
                    Arc::clone(&conn.connection),
                    call_timeout,
                )) as Arc<dyn Tool>
            })
            .collect()
    }

    /// List all connected servers with their tool counts, by name.
    pub async fn list_servers(&self) -> Vec<ProviderStatus> {
        let conns = self.connections.read().await;
        let mut servers: Vec<ProviderStatus> = conns
            .iter()
            .map(|(name, conn)| ProviderStatus {
                name: name.clone(),
                tool_count: conn.tools.len(),
                connected: !conn.connection.is_closed(),
            })
            .collect();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        servers
    }

    /// Get tool info for a specific server.
    pub async fn tool_info(&self, name: &str) -> Vec<McpToolInfo> {
        let conns = self.connections.read().await;
        conns.get(name).map(|c| c.tools.clone()).unwrap_or_default()
    }
}
