use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use splitbot_common::{Error, Result};
use tracing::debug;

use super::connection::{McpToolInfo, ToolConnection};
use crate::tools::{Tool, sanitize};

/// Joins provider and tool names in the registry.
pub const NAMESPACE_SEPARATOR: &str = "___";

/// Wraps a single MCP tool as a `Tool` implementation.
pub struct McpTool {
    /// `{server}___{tool}`.
    name: String,
    server_name: String,
    /// Tool name as the server knows it.
    remote_name: String,
    description: String,
    input_schema: Value,
    tags: Vec<String>,
    connection: Arc<dyn ToolConnection>,
    timeout: Duration,
}

impl McpTool {
    pub fn new(
        server_name: &str,
        info: &McpToolInfo,
        tags: Vec<String>,
        connection: Arc<dyn ToolConnection>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: format!("{server_name}{NAMESPACE_SEPARATOR}{}", info.name),
            server_name: server_name.to_string(),
            remote_name: info.name.clone(),
            description: info.description.clone().unwrap_or_default(),
            input_schema: info.input_schema.clone(),
            tags,
            connection,
            timeout,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    fn tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let arguments: Option<Map<String, Value>> = match sanitize(&args) {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(Error::Mcp(format!(
                    "arguments for '{}' must be an object, got {other}",
                    self.name
                )));
            }
        };

        debug!(
            server = %self.server_name,
            tool = %self.remote_name,
            "calling MCP tool"
        );

        tokio::time::timeout(
            self.timeout,
            self.connection.call_tool(&self.remote_name, arguments),
        )
        .await
        .map_err(|_| {
            Error::Mcp(format!(
                "tool '{}' timed out after {}s",
                self.name,
                self.timeout.as_secs()
            ))
        })?
    }
}
