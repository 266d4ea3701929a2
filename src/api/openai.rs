//! OpenAI-compatible Chat Completions client.
//!
//! Groq, OpenAI and most hosted inference services accept this wire format.
//! See: <https://platform.openai.com/docs/api-reference/chat>

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::client::{Client, ClientError};
use crate::http::{build_http_client, RequestBuilderExt, ResponseExt};
use crate::model::{FinishReason, Message, Response, ToolCallRequest, Usage};
use crate::options::{ModelOptions, TransportOptions};
use crate::tools::ToolSpec;

/// Trait for models compatible with OpenAI's Chat Completions API.
pub trait OpenAiCompatibleModel:
    Send + Sync + Default + Serialize + for<'de> Deserialize<'de> + Clone
{
}

/// Generic client for OpenAI-compatible Chat Completions APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient<M> {
    api_key: String,
    base_url: String,
    model_options: ModelOptions<M>,
    transport_options: TransportOptions,
}

impl<M: OpenAiCompatibleModel> OpenAiCompatibleClient<M> {
    /// Create a new client. `base_url` includes the API version segment.
    pub fn new(
        api_key: String,
        base_url: String,
        model_options: ModelOptions<M>,
        transport_options: TransportOptions,
    ) -> Self {
        Self {
            api_key,
            base_url,
            model_options,
            transport_options,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Point the client at another endpoint, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn handle_error_response(status: reqwest::StatusCode, body: &str) -> ClientError {
        if let Ok(error_resp) = serde_json::from_str::<ChatErrorResponse>(body) {
            ClientError::ProviderError(format!(
                "API error ({}): {}",
                error_resp.error.error_type.as_deref().unwrap_or("unknown"),
                error_resp.error.message
            ))
        } else {
            ClientError::ProviderError(format!("HTTP {}: {}", status, body))
        }
    }
}

#[async_trait]
impl<M: OpenAiCompatibleModel> Client for OpenAiCompatibleClient<M> {
    type ModelProvider = M;

    async fn request(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolSpec>,
    ) -> Result<Response, ClientError> {
        if self.model_options.model.is_empty() {
            return Err(ClientError::Config("Model must be specified".to_string()));
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request_body = ChatRequest::new(messages, &self.model_options, tools);

        let http_client = build_http_client(&self.transport_options)?;

        let response = http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json_logged(&request_body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text_logged().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, &body));
        }

        let chat_response: ChatResponse = response.json_logged().await?;
        Response::try_from(chat_response)
    }

    fn model_options(&self) -> &ModelOptions<Self::ModelProvider> {
        &self.model_options
    }

    fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }
}

impl<M: OpenAiCompatibleModel> ChatRequest<M> {
    /// Calls that were skipped (unknown tool, empty registry) are left out of
    /// the assistant message, as the API rejects a `tool_call` id that no
    /// `tool` message answers.
    fn new(messages_in: Vec<Message>, model_options: &ModelOptions<M>, tool_specs: Vec<ToolSpec>) -> Self {
        let answered: HashSet<String> = messages_in
            .iter()
            .filter_map(|msg| match msg {
                Message::ToolResult { call_id, .. } => Some(call_id.clone()),
                _ => None,
            })
            .collect();

        let messages = messages_in
            .into_iter()
            .map(|msg| match msg {
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let (kept, dropped): (Vec<_>, Vec<_>) = tool_calls
                        .into_iter()
                        .partition(|call| answered.contains(&call.id));
                    if !dropped.is_empty() {
                        debug!("Leaving {} unanswered tool calls off the wire", dropped.len());
                    }
                    let content = match content {
                        None if kept.is_empty() => Some(String::new()),
                        other => other,
                    };
                    Message::Assistant {
                        content,
                        tool_calls: kept,
                    }
                }
                other => other,
            })
            .map(ChatMessage::from)
            .collect();

        let tools = if tool_specs.is_empty() {
            None
        } else {
            Some(
                tool_specs
                    .into_iter()
                    .map(|spec| ChatTool {
                        tool_type: "function".to_string(),
                        function: ChatFunction {
                            name: spec.name,
                            description: Some(spec.description).filter(|d| !d.is_empty()),
                            parameters: spec.parameters,
                        },
                    })
                    .collect(),
            )
        };

        ChatRequest {
            model: model_options.model.clone(),
            messages,
            temperature: model_options.temperature,
            top_p: model_options.top_p,
            max_tokens: model_options.max_tokens,
            tools,
            provider_options: model_options.provider.clone(),
        }
    }
}

impl From<Message> for ChatMessage {
    fn from(msg: Message) -> Self {
        match msg {
            Message::System(content) => ChatMessage::text("system", content),
            Message::User(content) => ChatMessage::text("user", content),
            Message::Assistant {
                content,
                tool_calls,
            } => ChatMessage {
                role: "assistant".to_string(),
                content,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls.into_iter().map(ChatToolCall::from).collect())
                },
                tool_call_id: None,
                name: None,
            },
            Message::ToolResult {
                call_id,
                name,
                content,
            } => ChatMessage {
                role: "tool".to_string(),
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(call_id),
                name: Some(name),
            },
        }
    }
}

impl From<ToolCallRequest> for ChatToolCall {
    fn from(call: ToolCallRequest) -> Self {
        ChatToolCall {
            id: Some(call.id),
            tool_type: "function".to_string(),
            function: ChatFunctionCall {
                name: call.name,
                arguments: match call.arguments {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
            },
        }
    }
}

impl From<ChatToolCall> for ToolCallRequest {
    fn from(call: ChatToolCall) -> Self {
        let arguments = if call.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::String(call.function.arguments))
        };
        ToolCallRequest {
            id: call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple())),
            name: call.function.name,
            arguments,
        }
    }
}

impl TryFrom<ChatResponse> for Response {
    type Error = ClientError;

    fn try_from(chat_resp: ChatResponse) -> Result<Self, ClientError> {
        let usage = chat_resp.usage.map(|u| Usage {
            prompt_tokens: Some(u.prompt_tokens),
            completion_tokens: Some(u.completion_tokens),
        });

        let choice = chat_resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::ProviderError("Response contained no choices".to_string()))?;

        let finish = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::OutputTokens,
            Some("content_filter") => FinishReason::ContentFilter,
            Some("tool_calls") => FinishReason::ToolCalls,
            _ => FinishReason::Stop,
        };

        let message = Message::Assistant {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolCallRequest::from)
                .collect(),
        };

        Ok(Response {
            message,
            usage,
            finish,
        })
    }
}

// --- Chat Completions API Types ---

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<M> {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    tools: Option<Vec<ChatTool>>,
    #[serde(flatten)]
    provider_options: M,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
    tool_call_id: Option<String>,
    name: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: String) -> Self {
        ChatMessage {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    tool_type: String,
    function: ChatFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatFunction,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
struct ChatFunction {
    name: String,
    description: Option<String>,
    parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatError {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: String,
}
