//! # codewright Tools
//!
//! The tool dispatcher: decodes a model-issued tool call, executes it
//! against the contained workspace, attaches static-analysis findings, and
//! packages everything as a [`ToolOutcome`].
//!
//! Dispatch is infallible by construction. A bad tool name, malformed
//! arguments, or a refused file operation all become a *failed outcome*
//! whose text is fed back to the model, which may then self-correct. Only
//! the loop's own plumbing can error.

pub mod schema;

pub use schema::tool_definitions;

use std::path::PathBuf;

use tracing::{debug, warn};

use codewright_core::{Diagnostic, FileToCreate, ToolCallRequest, ToolOutcome, ToolRequest};
use codewright_diagnostics::DiagnosticsRunner;
use codewright_workspace::Workspace;

/// Executes local tool calls against one workspace.
pub struct ToolDispatcher {
    workspace: Workspace,
    diagnostics: DiagnosticsRunner,
}

impl ToolDispatcher {
    pub fn new(workspace: Workspace, diagnostics: DiagnosticsRunner) -> Self {
        Self { workspace, diagnostics }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Execute one tool call. Never returns an error: every failure mode is
    /// encoded in the outcome.
    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolOutcome {
        let request = match ToolRequest::parse(&call.name, &call.arguments) {
            Ok(req) => req,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool call");
                return ToolOutcome::failed(&call.id, e.to_string());
            }
        };

        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");

        match request {
            ToolRequest::ReadFile { file_path } => self.read_file(&call.id, &file_path).await,
            ToolRequest::ReadMultipleFiles { file_paths } => {
                self.read_multiple(&call.id, &file_paths).await
            }
            ToolRequest::CreateFile { file_path, content } => {
                self.create_file(&call.id, &file_path, &content).await
            }
            ToolRequest::CreateMultipleFiles { files } => {
                self.create_multiple(&call.id, &files).await
            }
            ToolRequest::EditFile { file_path, original_snippet, new_snippet } => {
                self.edit_file(&call.id, &file_path, &original_snippet, &new_snippet)
                    .await
            }
            // Namespaced calls are routed by the agent loop before reaching
            // the local dispatcher.
            ToolRequest::External { server, tool, .. } => ToolOutcome::failed(
                &call.id,
                format!("'{server}__{tool}' is an external tool, not a local one"),
            ),
        }
    }

    async fn read_file(&self, call_id: &str, file_path: &str) -> ToolOutcome {
        match self.workspace.read(file_path).await {
            Ok(content) => {
                let path = self.touched(file_path);
                let diagnostics = self.diagnostics.analyze(&path).await;
                let output = format!("Content of '{file_path}':\n\n{content}");
                finish(ToolOutcome::ok(call_id, output), vec![path], diagnostics)
            }
            Err(e) => ToolOutcome::failed(call_id, e.to_string()),
        }
    }

    async fn read_multiple(&self, call_id: &str, file_paths: &[String]) -> ToolOutcome {
        let mut lines = Vec::new();
        let mut paths = Vec::new();
        let mut diagnostics = Vec::new();
        let mut all_ok = true;

        for file_path in file_paths {
            match self.workspace.read(file_path).await {
                Ok(content) => {
                    let path = self.touched(file_path);
                    diagnostics.extend(self.diagnostics.analyze(&path).await);
                    paths.push(path);
                    lines.push(format!("Content of '{file_path}':\n\n{content}"));
                }
                Err(e) => {
                    all_ok = false;
                    lines.push(format!("Error reading '{file_path}': {e}"));
                }
            }
        }

        let outcome = batch_outcome(call_id, all_ok, lines.join("\n\n"));
        finish(outcome, paths, diagnostics)
    }

    async fn create_file(&self, call_id: &str, file_path: &str, content: &str) -> ToolOutcome {
        match self.workspace.write(file_path, content).await {
            Ok(path) => {
                let diagnostics = self.diagnostics.analyze(&path).await;
                let output = format!("Successfully created '{file_path}' ({} bytes)", content.len());
                finish(ToolOutcome::ok(call_id, output), vec![path], diagnostics)
            }
            Err(e) => ToolOutcome::failed(call_id, e.to_string()),
        }
    }

    /// Sequential, in argument order. One failing path does not abort the
    /// rest; success requires every path to succeed.
    async fn create_multiple(&self, call_id: &str, files: &[FileToCreate]) -> ToolOutcome {
        let mut lines = Vec::new();
        let mut paths = Vec::new();
        let mut diagnostics = Vec::new();
        let mut all_ok = true;

        for file in files {
            match self.workspace.write(&file.path, &file.content).await {
                Ok(path) => {
                    diagnostics.extend(self.diagnostics.analyze(&path).await);
                    paths.push(path);
                    lines.push(format!("Created '{}' ({} bytes)", file.path, file.content.len()));
                }
                Err(e) => {
                    all_ok = false;
                    lines.push(format!("Error creating '{}': {e}", file.path));
                }
            }
        }

        let outcome = batch_outcome(call_id, all_ok, lines.join("\n"));
        finish(outcome, paths, diagnostics)
    }

    async fn edit_file(
        &self,
        call_id: &str,
        file_path: &str,
        original_snippet: &str,
        new_snippet: &str,
    ) -> ToolOutcome {
        match self.workspace.edit(file_path, original_snippet, new_snippet).await {
            Ok(path) => {
                let diagnostics = self.diagnostics.analyze(&path).await;
                let output = format!("Successfully edited '{file_path}'");
                finish(ToolOutcome::ok(call_id, output), vec![path], diagnostics)
            }
            Err(e) => ToolOutcome::failed(call_id, e.to_string()),
        }
    }

    /// Resolved form of a path for the touched-paths record. Resolution has
    /// already succeeded by the time this is called.
    fn touched(&self, raw: &str) -> PathBuf {
        self.workspace.resolve(raw).unwrap_or_else(|_| PathBuf::from(raw))
    }
}

fn batch_outcome(call_id: &str, all_ok: bool, output: String) -> ToolOutcome {
    if all_ok {
        ToolOutcome::ok(call_id, output)
    } else {
        let mut outcome = ToolOutcome::failed(call_id, "one or more paths failed");
        outcome.output = output;
        outcome
    }
}

/// Attach paths and diagnostics, rendering any findings into the output so
/// they re-enter the conversation through the tool-result channel.
fn finish(mut outcome: ToolOutcome, paths: Vec<PathBuf>, diagnostics: Vec<Diagnostic>) -> ToolOutcome {
    outcome.paths = paths;
    if !diagnostics.is_empty() {
        outcome.output.push_str(&render_diagnostics_block(&diagnostics));
        outcome.diagnostics = diagnostics;
    }
    outcome
}

/// The feedback block appended to tool-result text when checkers found
/// something.
fn render_diagnostics_block(diagnostics: &[Diagnostic]) -> String {
    let mut block = String::from("\n\nLINTER DIAGNOSTICS:\n");
    for d in diagnostics {
        block.push_str(&d.render());
        block.push('\n');
    }
    block.push_str("Fix these issues where appropriate.");
    block
}
