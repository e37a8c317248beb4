pub mod mcp;
pub mod openai;
pub mod providers;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod tools;

pub use mcp::{Connector, McpManager, McpTool, McpToolInfo, ProviderStatus, ToolConnection};
pub use openai::OpenAiProvider;
pub use providers::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart,
    ToolCall, ToolDefinition, Usage,
};
pub use registry::{RegistryOptions, ToolRegistry};
pub use runtime::{AgentRuntime, EMPTY_REPLY, STEP_LIMIT_REPLY, StepState};
pub use schema::{ValidationError, Validator};
pub use tools::{HttpCurlTool, Tool};
