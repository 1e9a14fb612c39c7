//! Message and Conversation domain types.
//!
//! These are the core value objects that flow through the agent loop:
//! user text goes in, assistant messages and tool results accumulate, and
//! the final assistant text comes back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::tool::ToolCallRequest;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Pinned instructions; never pruned
    System,
    /// The person typing at the terminal
    User,
    /// The model's reply, possibly carrying tool calls
    Assistant,
    /// The result of one executed tool call
    Tool,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique per message
    pub id: String,

    pub role: Role,

    /// The text content (may be empty on assistant turns that only call tools)
    pub content: String,

    /// Reasoning text emitted alongside the answer by models that support it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Calls the assistant asked for on this turn, in issue order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// For Tool messages: the assistant call id this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            reasoning: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// Default eviction threshold: non-system messages beyond this are pruned.
pub const DEFAULT_MAX_MESSAGES: usize = 40;

/// An ordered message history with a bounded-growth policy.
///
/// Lives for one session and is never persisted. Pruning evicts the oldest
/// non-system messages once the threshold is exceeded, with one hard rule:
/// eviction never splits an assistant tool-call message from the tool
/// messages that answer it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,

    /// Every filesystem path any tool call has touched, in first-touch order.
    #[serde(default)]
    pub touched_paths: Vec<PathBuf>,

    /// Prune threshold (non-system message count).
    pub max_messages: usize,

    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::with_max_messages(DEFAULT_MAX_MESSAGES)
    }

    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            touched_paths: Vec::new(),
            max_messages,
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Record paths touched by a tool call. The log only ever grows.
    pub fn record_touched(&mut self, paths: &[PathBuf]) {
        for p in paths {
            if !self.touched_paths.contains(p) {
                self.touched_paths.push(p.clone());
            }
        }
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }

    /// Evict the oldest non-system messages until the threshold holds.
    ///
    /// System messages are pinned. The eviction boundary advances past any
    /// leading tool messages so that a tool result is never kept without
    /// the assistant message that requested it.
    pub fn prune(&mut self) {
        let non_system: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role != Role::System)
            .map(|(i, _)| i)
            .collect();

        if non_system.len() <= self.max_messages {
            return;
        }

        let mut cut = non_system.len() - self.max_messages;
        // A tool message at the boundary lost its assistant partner; evict
        // the rest of that group too.
        while cut < non_system.len() && self.messages[non_system[cut]].role == Role::Tool {
            cut += 1;
        }

        let evict: std::collections::HashSet<usize> = non_system[..cut].iter().copied().collect();
        let mut idx = 0;
        self.messages.retain(|_| {
            let keep = !evict.contains(&idx);
            idx += 1;
            keep
        });
    }

    /// Check the tool-call pairing invariant: every tool message answers an
    /// assistant tool-call id that appeared earlier, exactly once.
    pub fn pairing_intact(&self) -> bool {
        let mut pending: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for msg in &self.messages {
            match msg.role {
                Role::Assistant => {
                    for tc in &msg.tool_calls {
                        if !pending.insert(&tc.id) {
                            return false; // duplicate id within the window
                        }
                    }
                }
                Role::Tool => {
                    let Some(id) = msg.tool_call_id.as_deref() else {
                        return false;
                    };
                    if !pending.remove(id) {
                        return false; // orphan tool result
                    }
                }
                _ => {}
            }
        }
        pending.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
