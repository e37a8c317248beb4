use async_trait::async_trait;
use serde_json::{Value, json};
use splitbot_common::Result;
use tracing::debug;

use super::Tool;

pub const SKILL_PREFIX: &str = "skill_";

/// Companion tool returning the usage notes of another in-process tool.
pub struct SkillTool {
    name: String,
    description: String,
    target: String,
    text: String,
    tags: Vec<String>,
}

impl SkillTool {
    pub fn new(target: &str, text: String, tags: Vec<String>) -> Self {
        Self {
            name: format!("{SKILL_PREFIX}{target}"),
            description: format!(
                "Get a detailed description and a how-to-use tutorial with examples for the tool {target}"
            ),
            target: target.to_string(),
            text,
            tags,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl Tool for SkillTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        debug!("returning skill for tool '{}'", self.target);
        Ok(Value::String(self.text.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_skill_text_under_prefixed_name() {
        let tool = SkillTool::new("http_curl", "use GET".into(), vec!["web".into()]);
        assert_eq!(tool.name(), "skill_http_curl");
        assert_eq!(tool.target(), "http_curl");
        assert_eq!(tool.tags(), vec!["web".to_string()]);
        assert!(tool.description().contains("http_curl"));
        assert_eq!(tool.execute(json!({})).await.unwrap(), json!("use GET"));
    }
}
