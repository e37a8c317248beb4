mod connection;
mod manager;
mod tool_bridge;

pub use connection::{Connector, McpToolInfo, RmcpConnection, StdioConnector, ToolConnection};
pub use manager::{McpManager, ProviderStatus};
pub use tool_bridge::{McpTool, NAMESPACE_SEPARATOR};
