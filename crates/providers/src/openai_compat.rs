//! OpenAI-compatible provider adapter.
//!
//! Covers DeepSeek, OpenRouter, and any other backend exposing a
//! `/chat/completions` endpoint: conversation in, assistant message plus
//! optional reasoning text plus finalized tool calls out. Backend-native
//! payload shapes never leave this module.
//!
//! Reasoning-capable models (DeepSeek Reasoner, o3-style) emit a separate
//! `reasoning_content` field; it is surfaced on `Message.reasoning` and
//! never folded into the answer text.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use codewright_core::error::ProviderError;
use codewright_core::message::{Message, Role};
use codewright_core::provider::{
    Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition, Usage,
};
use codewright_core::tool::ToolCallRequest;

use crate::sse::{DONE_SENTINEL, SseLineBuffer, StreamPayload, ToolCallAssembler, WireUsage};

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// An OpenAI-compatible chat-completion backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    extra_headers: Vec<(String, String)>,
    reasoning: bool,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client with static configuration");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            extra_headers: Vec::new(),
            reasoning: false,
            client,
        }
    }

    /// Extra headers some gateways require (OpenRouter attribution etc).
    pub fn with_extra_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.extra_headers = headers;
        self
    }

    /// Mark this backend's model as emitting separate reasoning text.
    pub fn with_reasoning(mut self, enabled: bool) -> Self {
        self.reasoning = enabled;
        self
    }

    fn post(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(body);
        for (key, value) in &self.extra_headers {
            builder = builder.header(key, value);
        }
        builder
    }

    fn body(&self, request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": encode_messages(&request.messages),
            "stream": stream,
        });
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(encode_tools(&request.tools));
        }
        body
    }
}

/// Map an HTTP status to the provider error taxonomy; 200 passes.
fn check_status(status: u16, error_body: String) -> Result<(), ProviderError> {
    match status {
        200 => Ok(()),
        429 => Err(ProviderError::RateLimited { retry_after_secs: 5 }),
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            "API key rejected or lacks access to this model".into(),
        )),
        _ => Err(ProviderError::ApiError { status_code: status, message: error_body }),
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_reasoning(&self) -> bool {
        self.reasoning
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Requesting completion");

        let response = self
            .post(&self.body(&request, false))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion request failed");
            check_status(status, error_body)?;
            unreachable!("check_status always errors for non-200 status");
        }

        let completion: WireCompletion =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("unparseable completion body: {e}"),
            })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "completion carried no choices".into(),
            })?;

        Ok(ProviderResponse {
            message: decode_assistant(choice.message),
            model: completion.model,
            usage: completion.usage.map(decode_usage),
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        debug!(provider = %self.name, model = %request.model, "Opening completion stream");

        let response = self
            .post(&self.body(&request, true))
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Stream request failed");
            check_status(status, error_body)?;
            unreachable!("check_status always errors for non-200 status");
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = SseLineBuffer::new();
            let mut assembler = ToolCallAssembler::new();

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for payload in lines.feed(&chunk) {
                    if payload == DONE_SENTINEL {
                        let _ = tx.send(Ok(terminal_chunk(&assembler, None))).await;
                        return;
                    }

                    let parsed: StreamPayload = match serde_json::from_str(&payload) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            trace!(
                                provider = %provider_name, error = %e,
                                "Skipping malformed event"
                            );
                            continue;
                        }
                    };

                    if let Some(choice) = parsed.choices.first() {
                        for fragment in choice.delta.tool_calls.iter().flatten() {
                            assembler.absorb(fragment);
                        }

                        let content = choice.delta.content.clone().filter(|c| !c.is_empty());
                        let reasoning =
                            choice.delta.reasoning_content.clone().filter(|r| !r.is_empty());
                        if content.is_some() || reasoning.is_some() {
                            let delivered = tx
                                .send(Ok(StreamChunk {
                                    content,
                                    reasoning,
                                    tool_calls: Vec::new(),
                                    done: false,
                                    usage: None,
                                }))
                                .await;
                            if delivered.is_err() {
                                return; // receiver dropped
                            }
                        }
                    }

                    // With stream_options, usage rides the closing payload.
                    if let Some(usage) = parsed.usage {
                        let _ = tx.send(Ok(terminal_chunk(&assembler, Some(usage)))).await;
                        return;
                    }
                }
            }

            // Connection closed without a [DONE]; finalize what we have.
            let _ = tx.send(Ok(terminal_chunk(&assembler, None))).await;
        });

        Ok(rx)
    }
}

fn terminal_chunk(assembler: &ToolCallAssembler, usage: Option<WireUsage>) -> StreamChunk {
    StreamChunk {
        content: None,
        reasoning: None,
        tool_calls: assembler.finalized(),
        done: true,
        usage: usage.map(decode_usage),
    }
}

fn decode_usage(usage: WireUsage) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

/// Domain messages → wire shape. Answer text travels with the tool calls
/// when both are present; only genuinely empty content becomes `null`.
fn encode_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages.iter().map(encode_message).collect()
}

fn encode_message(message: &Message) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let tool_calls: Vec<WireToolCall> = message
        .tool_calls
        .iter()
        .map(|call| WireToolCall {
            id: call.id.clone(),
            kind: "function".into(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        })
        .collect();

    WireMessage {
        role: role.into(),
        content: (!message.content.is_empty()).then(|| message.content.clone()),
        reasoning_content: None,
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn encode_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}

/// Wire assistant message → domain message.
fn decode_assistant(wire: WireMessage) -> Message {
    let mut message = Message::assistant(wire.content.unwrap_or_default());
    message.reasoning = wire.reasoning_content.filter(|r| !r.is_empty());
    message.tool_calls = wire
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCallRequest {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();
    message
}

// Wire shapes. `reasoning_content` is deserialize-only: we never send
// reasoning back to the backend.

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing)]
    reasoning_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireCompletion {
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_encode_to_wire_names() {
        let wire = encode_messages(&[Message::system("rules"), Message::user("hi")]);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[1].content.as_deref(), Some("hi"));
    }

    #[test]
    fn assistant_tool_call_message_keeps_its_answer_text() {
        let mut msg = Message::assistant("reading it now");
        msg.tool_calls.push(ToolCallRequest {
            id: "call_1".into(),
            name: "read_file".into(),
            arguments: r#"{"file_path":"a.py"}"#.into(),
        });

        // Commentary produced alongside tool calls stays visible to the
        // model on later iterations.
        let wire = encode_message(&msg);
        assert_eq!(wire.content.as_deref(), Some("reading it now"));
        let calls = wire.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "read_file");

        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains(r#""type":"function""#));
        assert!(!json.contains("reasoning_content"));
    }

    #[test]
    fn assistant_tool_call_message_without_text_sends_null_content() {
        let mut msg = Message::assistant("");
        msg.tool_calls.push(ToolCallRequest {
            id: "call_1".into(),
            name: "read_file".into(),
            arguments: "{}".into(),
        });
        let wire = encode_message(&msg);
        assert!(wire.content.is_none());
        let json = serde_json::to_string(&wire).unwrap();
        assert!(!json.contains(r#""content""#));
    }

    #[test]
    fn tool_result_encodes_call_id() {
        let wire = encode_message(&Message::tool_result("call_9", "file text"));
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(wire.content.as_deref(), Some("file text"));
    }

    #[test]
    fn decode_surfaces_reasoning_separately() {
        let body = r#"{
            "model": "deepseek-reasoner",
            "choices": [{"message": {
                "role": "assistant",
                "content": "Done.",
                "reasoning_content": "First I checked the imports."
            }}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let completion: WireCompletion = serde_json::from_str(body).unwrap();
        let message = decode_assistant(completion.choices.into_iter().next().unwrap().message);

        assert_eq!(message.content, "Done.");
        assert_eq!(message.reasoning.as_deref(), Some("First I checked the imports."));
    }

    #[test]
    fn decode_empty_reasoning_is_none() {
        let wire = WireMessage {
            role: "assistant".into(),
            content: Some("hi".into()),
            reasoning_content: Some(String::new()),
            tool_calls: None,
            tool_call_id: None,
        };
        assert!(decode_assistant(wire).reasoning.is_none());
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(200, String::new()).is_ok());
        assert!(matches!(
            check_status(401, String::new()),
            Err(ProviderError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            check_status(429, String::new()),
            Err(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            check_status(502, "bad gateway".into()),
            Err(ProviderError::ApiError { status_code: 502, .. })
        ));
    }

    #[test]
    fn tool_schemas_encode_as_function_definitions() {
        let tools = encode_tools(&[ToolDefinition {
            name: "edit_file".into(),
            description: "Replace a snippet".into(),
            parameters: serde_json::json!({"type": "object"}),
        }]);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "edit_file");
    }
}
