use std::sync::Arc;

use futures::future::join_all;
use splitbot_common::{Error, Result};
use tracing::{debug, info, instrument, warn};

use crate::providers::{ChatMessage, LlmProvider, LlmRequest, ToolDefinition};
use crate::registry::ToolRegistry;

/// Default number of model/tool round trips in one turn.
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Returned when the model is still calling tools after `max_steps` rounds.
pub const STEP_LIMIT_REPLY: &str =
    "I could not finish working on this within the allowed number of steps. Please try narrowing down the request.";

/// Returned when the model ends the turn without any text.
pub const EMPTY_REPLY: &str = "I could not generate a reply.";

/// Conversation of one turn and how many tool rounds it has used.
#[derive(Debug, Clone, Default)]
pub struct StepState {
    pub conversation: Vec<ChatMessage>,
    pub steps_taken: usize,
}

/// Drives the model through a bounded tool-calling loop.
pub struct AgentRuntime {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    system_prompt: Option<String>,
    model: String,
    max_tokens: Option<u32>,
    max_steps: usize,
    tool_tags: Option<Vec<String>>,
}

impl AgentRuntime {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            system_prompt: None,
            model: model.into(),
            max_tokens: None,
            max_steps: DEFAULT_MAX_STEPS,
            tool_tags: None,
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn set_system_prompt(&mut self, prompt: String) {
        self.system_prompt = Some(prompt);
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.max_tokens = Some(max_tokens);
    }

    /// Values below 1 are raised to 1.
    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps.max(1);
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn set_tool_tags(&mut self, tags: Option<Vec<String>>) {
        self.tool_tags = tags;
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.list_definitions(self.tool_tags.as_deref())
    }

    /// Run one turn over `conversation` and return the reply text.
    ///
    /// Tool failures are fed back to the model; only model client errors
    /// end the turn with an error.
    #[instrument(skip_all, fields(messages = conversation.len()))]
    pub async fn run_turn(&self, conversation: Vec<ChatMessage>) -> Result<String> {
        let tools = self.tool_definitions();
        let mut state = StepState {
            conversation,
            steps_taken: 0,
        };

        while state.steps_taken < self.max_steps {
            debug!(step = state.steps_taken + 1, "requesting model completion");

            let request = LlmRequest {
                model: self.model.clone(),
                messages: state.conversation.clone(),
                system: self.system_prompt.clone(),
                max_tokens: self.max_tokens,
                tools: tools.clone(),
            };

            let response = self.provider.complete(&request).await.map_err(|e| match e {
                Error::Model(_) => e,
                other => Error::Model(other.to_string()),
            })?;

            if let Some(usage) = response.usage {
                debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    stop_reason = ?response.stop_reason,
                    "model responded"
                );
            }

            let calls = response.tool_calls();

            if calls.is_empty() {
                let text = response.text();
                if text.trim().is_empty() {
                    warn!("model returned an empty reply");
                    return Ok(EMPTY_REPLY.to_string());
                }
                info!(steps = state.steps_taken, "turn completed");
                return Ok(text);
            }

            state
                .conversation
                .push(ChatMessage::assistant_blocks(response.content));

            let results = join_all(
                calls
                    .iter()
                    .map(|call| self.registry.dispatch(&call.name, call.input.clone())),
            )
            .await;

            for (call, result) in calls.iter().zip(results) {
                let message = match result {
                    Ok(value) => ChatMessage::tool_result(&call.id, render_result(&value), false),
                    Err(e) => {
                        warn!("tool '{}' failed: {e}", call.name);
                        ChatMessage::tool_result(&call.id, e.to_string(), true)
                    }
                };
                state.conversation.push(message);
            }

            state.steps_taken += 1;
        }

        warn!(max_steps = self.max_steps, "step limit reached without a final reply");
        Ok(STEP_LIMIT_REPLY.to_string())
    }
}

fn render_result(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
