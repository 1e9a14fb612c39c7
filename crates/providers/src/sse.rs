//! Server-sent-event plumbing for chat-completion streams.
//!
//! Two small pieces the adapter composes: a byte-to-event line buffer, and
//! an assembler that stitches indexed tool-call fragments back into whole
//! calls. Both are synchronous and directly testable; the async transport
//! stays in the adapter.

use serde::Deserialize;
use std::collections::BTreeMap;

use codewright_core::tool::ToolCallRequest;

/// Splits an SSE byte stream into `data:` payloads.
///
/// Chunks can cut lines anywhere, so bytes are buffered until a newline
/// lands. Comment lines (`:` prefix) and blank separators are dropped.
#[derive(Default)]
pub struct SseLineBuffer {
    pending: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every complete `data:` payload they finish.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(end) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=end).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(data) = line.strip_prefix("data: ") {
                payloads.push(data.trim().to_string());
            }
        }
        payloads
    }
}

/// The sentinel payload closing an OpenAI-style stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One parsed stream payload.
#[derive(Debug, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    pub delta: StreamDelta,
}

/// Incremental fields; any subset may be present in one payload.
#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

/// A slice of one tool call; `index` identifies which call it extends.
#[derive(Debug, Deserialize)]
pub struct ToolCallFragment {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reassembles tool calls from indexed fragments.
///
/// Keyed by fragment index in a `BTreeMap` so finalization preserves the
/// model's call order; the loop dispatches strictly in that order.
#[derive(Default)]
pub struct ToolCallAssembler {
    partial: BTreeMap<u32, PartialCall>,
}

#[derive(Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, fragment: &ToolCallFragment) {
        let slot = self.partial.entry(fragment.index).or_default();
        if let Some(id) = &fragment.id {
            slot.id.clone_from(id);
        }
        if let Some(function) = &fragment.function {
            if let Some(name) = &function.name {
                slot.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                slot.arguments.push_str(arguments);
            }
        }
    }

    /// The completed calls, in index order. Non-destructive: the terminal
    /// chunk may be produced more than once on odd streams.
    pub fn finalized(&self) -> Vec<ToolCallRequest> {
        self.partial
            .values()
            .map(|p| ToolCallRequest {
                id: p.id.clone(),
                name: p.name.clone(),
                arguments: p.arguments.clone(),
            })
            .collect()
    }
}
