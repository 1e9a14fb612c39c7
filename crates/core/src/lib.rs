//! # codewright Core
//!
//! Domain types, traits, and errors for the codewright coding assistant.
//! Every other crate depends inward on this one; nothing here depends on a
//! framework, an HTTP client, or a subprocess.
//!
//! Subsystems are expressed as traits (`Provider`, `ExternalToolClient`)
//! or plain value types, so implementations can be swapped per
//! configuration and tests can script them directly.

pub mod diagnostic;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use diagnostic::{Diagnostic, Severity};
pub use error::{Error, FileAccessError, ProviderError, Result, ToolError};
pub use message::{Conversation, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use tool::{
    ExternalToolClient, FileToCreate, ToolCallRequest, ToolOutcome, ToolRequest,
    split_namespaced_name,
};
pub use turn::{IterationState, StopReason};
