//! Tool-call domain types.
//!
//! The model requests operations against the local filesystem by name.
//! Rather than dispatching on duck-typed payloads, the supported operations
//! form a closed enum with a strict schema per variant: arguments are
//! validated at the boundary and anything unknown or malformed becomes a
//! typed error result, never a panic and never a silently-accepted call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diagnostic::Diagnostic;
use crate::error::ToolError;

/// A tool call as it arrives from the provider: name plus the raw,
/// provider-native argument encoding (usually JSON text). The raw form is
/// kept so parse failures can be reported against the exact payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique within one assistant turn; tool results refer back to it.
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One entry of a `create_multiple_files` batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileToCreate {
    pub path: String,
    pub content: String,
}

// Per-variant argument schemas. `deny_unknown_fields` keeps the boundary
// strict: an extra or misspelled key is a parse error the model gets told
// about, not something we guess at.

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadFileArgs {
    file_path: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadMultipleFilesArgs {
    file_paths: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateFileArgs {
    file_path: String,
    content: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateMultipleFilesArgs {
    files: Vec<FileToCreate>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EditFileArgs {
    file_path: String,
    original_snippet: String,
    new_snippet: String,
}

/// The closed set of operations the dispatcher understands.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    ReadFile {
        file_path: String,
    },
    ReadMultipleFiles {
        file_paths: Vec<String>,
    },
    CreateFile {
        file_path: String,
        content: String,
    },
    CreateMultipleFiles {
        files: Vec<FileToCreate>,
    },
    EditFile {
        file_path: String,
        original_snippet: String,
        new_snippet: String,
    },
    /// A call namespaced to an external tool server (`server__tool`).
    External {
        server: String,
        tool: String,
        arguments: serde_json::Value,
    },
}

/// The names of the locally-executed tools, as advertised to the model.
pub const LOCAL_TOOL_NAMES: [&str; 5] = [
    "read_file",
    "read_multiple_files",
    "create_file",
    "create_multiple_files",
    "edit_file",
];

/// Split a `server__tool` name into its server and tool halves.
///
/// Local tool names contain single underscores only, so the double
/// underscore is unambiguous.
pub fn split_namespaced_name(name: &str) -> Option<(&str, &str)> {
    if LOCAL_TOOL_NAMES.contains(&name) {
        return None;
    }
    let (server, tool) = name.split_once("__")?;
    if server.is_empty() || tool.is_empty() {
        return None;
    }
    Some((server, tool))
}

impl ToolRequest {
    /// Parse a tool name + raw argument text into a validated request.
    ///
    /// A malformed body or an unknown name is an error *value* tied to this
    /// call; the iteration carries on and the model may self-correct.
    pub fn parse(name: &str, raw_arguments: &str) -> Result<Self, ToolError> {
        fn args<T: serde::de::DeserializeOwned>(name: &str, raw: &str) -> Result<T, ToolError> {
            serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
                tool_name: name.into(),
                reason: e.to_string(),
            })
        }

        match name {
            "read_file" => {
                let a: ReadFileArgs = args(name, raw_arguments)?;
                Ok(Self::ReadFile { file_path: a.file_path })
            }
            "read_multiple_files" => {
                let a: ReadMultipleFilesArgs = args(name, raw_arguments)?;
                Ok(Self::ReadMultipleFiles { file_paths: a.file_paths })
            }
            "create_file" => {
                let a: CreateFileArgs = args(name, raw_arguments)?;
                Ok(Self::CreateFile {
                    file_path: a.file_path,
                    content: a.content,
                })
            }
            "create_multiple_files" => {
                let a: CreateMultipleFilesArgs = args(name, raw_arguments)?;
                Ok(Self::CreateMultipleFiles { files: a.files })
            }
            "edit_file" => {
                let a: EditFileArgs = args(name, raw_arguments)?;
                Ok(Self::EditFile {
                    file_path: a.file_path,
                    original_snippet: a.original_snippet,
                    new_snippet: a.new_snippet,
                })
            }
            other => match split_namespaced_name(other) {
                Some((server, tool)) => {
                    let arguments: serde_json::Value = serde_json::from_str(raw_arguments)
                        .map_err(|e| ToolError::InvalidArguments {
                            tool_name: other.into(),
                            reason: e.to_string(),
                        })?;
                    Ok(Self::External {
                        server: server.into(),
                        tool: tool.into(),
                        arguments,
                    })
                }
                None => Err(ToolError::UnknownTool(other.into())),
            },
        }
    }
}

/// The structured result of executing one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// The call ID this outcome answers.
    pub call_id: String,
    pub success: bool,
    /// Human-readable summary fed back to the model as tool-result text.
    pub output: String,
    /// Static-analysis findings attached by the dispatcher.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Every filesystem path this call touched (read, created, or edited).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,
    /// Error detail when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: output.into(),
            diagnostics: Vec::new(),
            paths: Vec::new(),
            error: None,
        }
    }

    pub fn failed(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            call_id: call_id.into(),
            success: false,
            output: format!("Error: {error}"),
            diagnostics: Vec::new(),
            paths: Vec::new(),
            error: Some(error),
        }
    }
}

/// Client for auxiliary tool servers. The agent loop treats a namespaced
/// tool name exactly like a local call: the returned text (or error text)
/// becomes the tool-result message.
#[async_trait]
pub trait ExternalToolClient: Send + Sync {
    async fn invoke(
        &self,
        server: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolError>;
}
