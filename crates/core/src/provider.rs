//! Provider trait — the abstraction over chat-completion backends.
//!
//! A Provider knows how to send a conversation to an LLM endpoint and get
//! an assistant message back, either complete or as a stream of chunks.
//! Provider-specific payload shapes are translated at the adapter boundary
//! only; nothing provider-native leaks into the conversation or the loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolCallRequest;

/// Everything one completion call needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "deepseek-reasoner", "anthropic/claude-sonnet-4")
    pub model: String,

    pub messages: Vec<Message>,

    /// Generation cap, when the caller wants one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool schemas advertised for this call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Request incremental delivery
    #[serde(default)]
    pub stream: bool,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: serde_json::Value,
}

/// A finished response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message (text + reasoning + tool calls)
    pub message: Message,

    /// The model that actually answered; gateways may substitute
    pub model: String,

    pub usage: Option<Usage>,
}

/// Token accounting as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
///
/// Text and reasoning deltas arrive first; the finalized tool-call set only
/// arrives on the `done` chunk. The agent loop advances on the done chunk —
/// partial text is a presentation concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Answer-text delta
    #[serde(default)]
    pub content: Option<String>,

    /// Partial reasoning delta (models with reasoning support)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Finalized tool calls (only populated on the final chunk)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Marks the last chunk of the stream
    #[serde(default)]
    pub done: bool,

    /// Reported on the final chunk when the backend provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
///
/// Every backend implements this; the agent loop calls `complete()` or
/// `stream()` without knowing which provider is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "deepseek", "openrouter").
    fn name(&self) -> &str;

    /// Whether this provider's models emit separate reasoning text.
    fn supports_reasoning(&self) -> bool {
        false
    }

    /// Whether `stream()` delivers true incremental chunks.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// One full round-trip: conversation in, assistant message out.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Incremental delivery over a channel.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single done chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.message.content),
                reasoning: response.message.reasoning,
                tool_calls: response.message.tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "read_file".into(),
            description: "Read the content of a single file".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": { "type": "string" }
                },
                "required": ["file_path"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("read_file"));
        assert!(json.contains("file_path"));
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        struct Fixed;

        #[async_trait]
        impl Provider for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            async fn complete(
                &self,
                _request: ProviderRequest,
            ) -> std::result::Result<ProviderResponse, ProviderError> {
                Ok(ProviderResponse {
                    message: Message::assistant("hello"),
                    model: "fixed-1".into(),
                    usage: None,
                })
            }
        }

        let mut rx = Fixed
            .stream(ProviderRequest {
                model: "fixed-1".into(),
                messages: vec![],
                max_tokens: None,
                tools: vec![],
                stream: true,
            })
            .await
            .unwrap();

        let chunk = rx.recv().await.unwrap().unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.content.as_deref(), Some("hello"));
    }
}
