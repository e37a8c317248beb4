use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use splitbot_common::{Error, Result};
use tracing::debug;

use crate::providers::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart,
    ToolDefinition, Usage,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat-completions client for OpenAI and API-compatible servers.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = wire::encode_request(request)?;
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("chat completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "chat completion returned status={}: {detail}",
                status.as_u16()
            )));
        }

        let completion: wire::Completion = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("malformed chat completion: {e}")))?;
        wire::decode_completion(completion)
    }
}

/// Chat-completions payloads and their mapping to the provider types.
mod wire {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    pub struct CompletionRequest {
        pub model: String,
        pub messages: Vec<Message>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tools: Vec<FunctionTool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub max_tokens: Option<u32>,
    }

    #[derive(Serialize)]
    #[serde(tag = "role", rename_all = "lowercase")]
    pub enum Message {
        System {
            content: String,
        },
        User {
            content: String,
        },
        Assistant {
            #[serde(skip_serializing_if = "Option::is_none")]
            content: Option<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            tool_calls: Vec<FunctionCall>,
        },
        Tool {
            tool_call_id: String,
            content: String,
        },
    }

    #[derive(Serialize, Deserialize)]
    pub struct FunctionCall {
        pub id: String,
        #[serde(rename = "type", default = "function_kind")]
        pub kind: String,
        pub function: CalledFunction,
    }

    #[derive(Serialize, Deserialize)]
    pub struct CalledFunction {
        pub name: String,
        #[serde(default)]
        pub arguments: String,
    }

    #[derive(Serialize)]
    pub struct FunctionTool {
        #[serde(rename = "type")]
        kind: &'static str,
        function: FunctionDecl,
    }

    #[derive(Serialize)]
    struct FunctionDecl {
        name: String,
        description: String,
        parameters: Value,
    }

    impl From<&ToolDefinition> for FunctionTool {
        fn from(def: &ToolDefinition) -> Self {
            Self {
                kind: "function",
                function: FunctionDecl {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    parameters: def.input_schema.clone(),
                },
            }
        }
    }

    #[derive(Deserialize)]
    pub struct Completion {
        #[serde(default)]
        model: String,
        choices: Vec<Choice>,
        usage: Option<TokenUsage>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: ReplyMessage,
        finish_reason: Option<String>,
    }

    #[derive(Deserialize)]
    struct ReplyMessage {
        content: Option<String>,
        #[serde(default)]
        tool_calls: Vec<FunctionCall>,
    }

    #[derive(Deserialize)]
    struct TokenUsage {
        prompt_tokens: u32,
        completion_tokens: u32,
    }

    fn function_kind() -> String {
        "function".to_string()
    }

    pub fn encode_request(request: &LlmRequest) -> Result<CompletionRequest> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(Message::System {
                content: system.clone(),
            });
        }
        for message in &request.messages {
            encode_message(message, &mut messages)?;
        }

        Ok(CompletionRequest {
            model: request.model.clone(),
            messages,
            tools: request.tools.iter().map(FunctionTool::from).collect(),
            max_tokens: request.max_tokens,
        })
    }

    /// Appends the wire form of `message`. A tool-role message becomes one
    /// wire message per result block it carries.
    pub fn encode_message(message: &ChatMessage, out: &mut Vec<Message>) -> Result<()> {
        match message.role {
            ChatRole::System => out.push(Message::System {
                content: message.text(),
            }),
            ChatRole::User => out.push(Message::User {
                content: message.text(),
            }),
            ChatRole::Assistant => {
                let blocks = match &message.content {
                    MessagePart::Text(text) => {
                        out.push(Message::Assistant {
                            content: Some(text.clone()),
                            tool_calls: Vec::new(),
                        });
                        return Ok(());
                    }
                    MessagePart::Parts(blocks) => blocks,
                };

                let mut tool_calls = Vec::new();
                for block in blocks {
                    if let ContentBlock::ToolUse { id, name, input } = block {
                        tool_calls.push(FunctionCall {
                            id: id.clone(),
                            kind: function_kind(),
                            function: CalledFunction {
                                name: name.clone(),
                                arguments: serde_json::to_string(input)?,
                            },
                        });
                    }
                }
                let text = message.text();
                out.push(Message::Assistant {
                    content: (!text.is_empty()).then_some(text),
                    tool_calls,
                });
            }
            ChatRole::Tool => {
                let before = out.len();
                if let MessagePart::Parts(blocks) = &message.content {
                    for block in blocks {
                        if let ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            ..
                        } = block
                        {
                            out.push(Message::Tool {
                                tool_call_id: tool_use_id.clone(),
                                content: content.clone(),
                            });
                        }
                    }
                }
                if out.len() == before {
                    return Err(Error::Model(
                        "tool message carries no tool_result block".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn decode_completion(completion: Completion) -> Result<LlmResponse> {
        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(Error::Model("chat completion has no choices".to_string()));
        };

        let mut content = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlock::Text { text });
        }
        for call in choice.message.tool_calls {
            content.push(ContentBlock::ToolUse {
                id: call.id,
                input: parse_arguments(&call.function.arguments),
                name: call.function.name,
            });
        }

        Ok(LlmResponse {
            content,
            model: completion.model,
            usage: completion.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            stop_reason: choice.finish_reason,
        })
    }

    /// Blank arguments mean "no arguments". Unparseable ones are passed on as
    /// a string so validation reports them to the model.
    fn parse_arguments(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return Value::Object(Map::new());
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}
