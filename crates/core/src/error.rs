//! Error types for the codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error enum; the taxonomy separates fatal failures
//! (configuration, provider transport) from recoverable ones (tool
//! arguments, file access), which are fed back to the model as tool-result
//! text instead of terminating the turn.

use thiserror::Error;

/// The top-level error type for all codewright operations.
///
/// Only `Config` and `Provider` variants terminate an agent turn; everything
/// else is converted into a failed tool outcome before it reaches the loop.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("File access error: {0}")]
    FileAccess(#[from] FileAccessError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias for fallible codewright operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the provider adapter. Fatal for the current turn; the
/// conversation is preserved so the session can continue afterwards.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider returned {status_code}: {message}")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication rejected: {0}")]
    AuthenticationFailed(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("network failure: {0}")]
    Network(String),
}

/// Errors raised while decoding or routing a tool call. Non-fatal: the
/// dispatcher converts these into failed tool outcomes so the model can
/// self-correct on the next iteration.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments for '{tool_name}': {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("External tool server '{server}' failed: {reason}")]
    ExternalServer { server: String, reason: String },
}

/// Errors from safe file access. Also non-fatal; every variant maps onto a
/// failed tool outcome with the error text surfaced to the model.
#[derive(Debug, Error)]
pub enum FileAccessError {
    #[error("Path '{path}' resolves outside the project root")]
    OutsideRoot { path: String },

    #[error("File not found: '{path}'")]
    NotFound { path: String },

    #[error("File '{path}' is {size} bytes, above the {limit}-byte limit")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("File '{path}' appears to be binary")]
    Binary { path: String },

    #[error("Original snippet not found in '{path}'")]
    SnippetNotFound { path: String },

    #[error("Ambiguous edit: snippet occurs {count} times in '{path}'")]
    AmbiguousSnippet { path: String, count: usize },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
