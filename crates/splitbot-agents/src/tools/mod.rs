mod curl;
mod sanitize;
mod skill;

pub use curl::HttpCurlTool;
pub use sanitize::sanitize;
pub use skill::{SKILL_PREFIX, SkillTool};

use async_trait::async_trait;
use serde_json::Value;
use splitbot_common::Result;

use crate::schema::{self, Validator};

/// A capability the model can invoke.
///
/// In-process tools implement this directly; tools hosted by a subprocess
/// server are wrapped by [`crate::mcp::McpTool`]. The registry validates and
/// sanitizes arguments before `execute` is called.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn input_schema(&self) -> Value;

    /// Validator derived from [`Tool::input_schema`].
    fn validator(&self) -> Validator {
        schema::translate(Some(&self.input_schema()))
    }

    /// Tags used to scope which tools are offered to the model.
    fn tags(&self) -> Vec<String> {
        Vec::new()
    }

    async fn execute(&self, args: Value) -> Result<Value>;

    /// Usage notes published as a `skill_{name}` companion tool.
    async fn skill(&self) -> Option<String> {
        None
    }
}
