//! The recursive tool-calling loop.
//!
//! One `run_turn` call takes a user message and drives the
//! model/tool-dispatch cycle until the work settles, the model stops asking
//! for tools, the iteration bound is hit, or the user cancels. Tool calls
//! execute strictly in order within an iteration — a later call may depend
//! on an earlier call's file effects.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use codewright_core::{
    Conversation, Error, ExternalToolClient, IterationState, Message, Provider, ProviderRequest,
    StopReason, ToolCallRequest, ToolRequest, split_namespaced_name,
};
use codewright_tools::{ToolDispatcher, tool_definitions};

/// Default bound on model/tool iterations within one turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Consecutive whitespace-only edit iterations tolerated before the loop
/// declares the work settled.
const TRIVIAL_EDIT_LIMIT: u32 = 3;

/// Text cues suggesting the assistant intends to keep working. Deliberately
/// coarse: a miss only costs one early stop, never correctness.
const CONTINUATION_CUES: &[&str] = &[
    "let me",
    "i'll",
    "i will",
    "next step",
    "now i",
    "continuing",
    "still need",
];

/// The result of one completed agent turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant text to show the user.
    pub text: String,
    pub reason: StopReason,
    /// How many provider round-trips the turn used.
    pub iterations: u32,
}

/// Drives conversations through the provider/tool cycle.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    dispatcher: ToolDispatcher,
    external: Option<Arc<dyn ExternalToolClient>>,
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            dispatcher,
            external: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_external(mut self, client: Arc<dyn ExternalToolClient>) -> Self {
        self.external = Some(client);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Run one turn. Fatal provider failures propagate as `Err` with the
    /// conversation preserved, so the session can continue afterwards.
    ///
    /// `cancel` scopes to this turn only: cancelling it aborts at the next
    /// iteration boundary and a later turn with a fresh token proceeds
    /// normally.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, Error> {
        conversation.push(Message::user(user_text));
        conversation.prune();

        let mut last_text = String::new();
        let mut consecutive_trivial = 0u32;

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                info!(iteration, "Turn cancelled");
                return Ok(TurnOutcome {
                    text: last_text,
                    reason: StopReason::Cancelled,
                    iterations: iteration - 1,
                });
            }

            let mut state = IterationState { iteration, ..Default::default() };

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                max_tokens: None,
                tools: tool_definitions(),
                stream: true,
            };

            debug!(iteration, messages = request.messages.len(), "Requesting completion");
            let assistant = self.collect_assistant(request).await?;
            let tool_calls = assistant.tool_calls.clone();
            if !assistant.content.is_empty() {
                last_text = assistant.content.clone();
            }
            conversation.push(assistant);

            state.had_tool_calls = !tool_calls.is_empty();
            if !state.had_tool_calls {
                debug!(iteration, "Assistant answered without tool calls");
                state.reason = Some(StopReason::NoFurtherCalls);
            } else {
                let mut edit_calls = 0u32;
                let mut trivial_edits = 0u32;

                for call in &tool_calls {
                    if let Some((original, new)) = edit_snippets(call) {
                        edit_calls += 1;
                        if whitespace_only_change(&original, &new) {
                            trivial_edits += 1;
                        }
                    }

                    let (result_text, diagnostics_reported, paths) = self.execute(call).await;
                    if diagnostics_reported {
                        state.diagnostics_reported = true;
                    }
                    conversation.record_touched(&paths);
                    conversation.push(Message::tool_result(&call.id, result_text));
                }
                conversation.prune();

                // Guard against edit loops that only shuffle whitespace.
                if edit_calls > 0 && edit_calls == trivial_edits {
                    consecutive_trivial += 1;
                } else {
                    consecutive_trivial = 0;
                }

                if consecutive_trivial >= TRIVIAL_EDIT_LIMIT {
                    warn!(iteration, "Stopping after repeated whitespace-only edits");
                    state.reason = Some(StopReason::Completed);
                } else if !state.diagnostics_reported && !signals_unfinished(&last_text) {
                    debug!(iteration, "Work settled");
                    state.reason = Some(StopReason::Completed);
                }
            }

            if let Some(reason) = state.reason {
                return Ok(TurnOutcome { text: last_text, reason, iterations: iteration });
            }
        }

        info!(max_iterations = self.max_iterations, "Iteration bound reached");
        let mut text = last_text;
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&format!(
            "[Stopped after {} iterations without settling; the work above may be incomplete.]",
            self.max_iterations
        ));
        Ok(TurnOutcome {
            text,
            reason: StopReason::Exhausted,
            iterations: self.max_iterations,
        })
    }

    /// Consume the provider stream into one assistant message. Tool calls
    /// only finalize on the done chunk, so the loop never acts on a
    /// partially-assembled call; partial text is a presentation concern.
    async fn collect_assistant(&self, request: ProviderRequest) -> Result<Message, Error> {
        let mut rx = self.provider.stream(request).await.map_err(Error::from)?;

        let mut content = String::new();
        let mut reasoning = String::new();
        let mut tool_calls = Vec::new();

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.map_err(Error::from)?;
            if let Some(delta) = chunk.content {
                content.push_str(&delta);
            }
            if let Some(delta) = chunk.reasoning {
                reasoning.push_str(&delta);
            }
            if chunk.done {
                tool_calls = chunk.tool_calls;
                break;
            }
        }

        let mut assistant = Message::assistant(content);
        assistant.reasoning = (!reasoning.is_empty()).then_some(reasoning);
        assistant.tool_calls = tool_calls;
        Ok(assistant)
    }

    /// Execute one call, local or external. Returns the tool-result text,
    /// whether diagnostics were attached, and the touched paths.
    async fn execute(&self, call: &ToolCallRequest) -> (String, bool, Vec<std::path::PathBuf>) {
        if let Some((server, tool)) = split_namespaced_name(&call.name) {
            return (self.execute_external(call, server, tool).await, false, Vec::new());
        }

        let outcome = self.dispatcher.dispatch(call).await;
        (outcome.output, !outcome.diagnostics.is_empty(), outcome.paths)
    }

    async fn execute_external(&self, call: &ToolCallRequest, server: &str, tool: &str) -> String {
        let Some(client) = &self.external else {
            return format!("Error: no tool server is configured for '{server}'");
        };
        let arguments: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(e) => return format!("Error: invalid arguments for '{}': {e}", call.name),
        };
        match client.invoke(server, tool, arguments).await {
            Ok(text) => text,
            Err(e) => {
                warn!(server, tool, error = %e, "External tool call failed");
                format!("Error: {e}")
            }
        }
    }
}

fn edit_snippets(call: &ToolCallRequest) -> Option<(String, String)> {
    if call.name != "edit_file" {
        return None;
    }
    match ToolRequest::parse(&call.name, &call.arguments) {
        Ok(ToolRequest::EditFile { original_snippet, new_snippet, .. }) => {
            Some((original_snippet, new_snippet))
        }
        _ => None,
    }
}

/// Whether two snippets differ only in whitespace.
fn whitespace_only_change(original: &str, new: &str) -> bool {
    let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    strip(original) == strip(new)
}

/// Whether the assistant's text reads like work in progress.
fn signals_unfinished(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTINUATION_CUES.iter().any(|cue| lower.contains(cue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codewright_core::error::{ProviderError, ToolError};
    use codewright_core::provider::ProviderResponse;
    use codewright_core::Role;
    use codewright_diagnostics::DiagnosticsRunner;
    use codewright_workspace::Workspace;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Replays a fixed sequence of assistant messages, one per iteration.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Message>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Message>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(script.into()) })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let message = self
                .script
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| ProviderError::Network("script exhausted".into()))?;
            Ok(ProviderResponse { message, model: "scripted-1".into(), usage: None })
        }
    }

    fn assistant_with_call(text: &str, id: &str, name: &str, arguments: &str) -> Message {
        let mut msg = Message::assistant(text);
        msg.tool_calls.push(ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        });
        msg
    }

    fn agent_in(dir: &tempfile::TempDir, script: Vec<Message>) -> AgentLoop {
        let dispatcher = ToolDispatcher::new(Workspace::new(dir.path()), DiagnosticsRunner::new());
        AgentLoop::new(ScriptedProvider::new(script), "scripted-1", dispatcher)
    }

    #[tokio::test]
    async fn turn_with_tool_call_then_answer() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            assistant_with_call(
                "I'll create the file now.",
                "call_1",
                "create_file",
                r#"{"file_path":"hello.txt","content":"hi"}"#,
            ),
            Message::assistant("Created hello.txt with a greeting."),
        ];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "make hello.txt", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.reason, StopReason::NoFurtherCalls);
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.text.contains("Created hello.txt"));
        assert!(dir.path().join("hello.txt").exists());
        assert!(conv.pairing_intact());
        assert_eq!(conv.touched_paths.len(), 1);
    }

    #[tokio::test]
    async fn settles_without_continuation_cue() {
        let dir = tempfile::tempdir().unwrap();
        // Text carries no cue and the .txt file produces no diagnostics,
        // so the loop stops after one iteration.
        let script = vec![assistant_with_call(
            "Done. The file is created.",
            "call_1",
            "create_file",
            r#"{"file_path":"a.txt","content":"x"}"#,
        )];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "create a.txt", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::Completed);
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn exhausts_at_iteration_bound() {
        let dir = tempfile::tempdir().unwrap();
        let script: Vec<Message> = (0..3)
            .map(|i| {
                assistant_with_call(
                    "Still working, let me continue.",
                    &format!("call_{i}"),
                    "create_file",
                    &format!(r#"{{"file_path":"f{i}.txt","content":"x"}}"#),
                )
            })
            .collect();
        let agent = agent_in(&dir, script).with_max_iterations(3);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "keep going", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::Exhausted);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.text.contains("Stopped after 3 iterations"));
        assert!(conv.pairing_intact());
    }

    #[tokio::test]
    async fn malformed_tool_arguments_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            assistant_with_call("Let me read that.", "call_1", "read_file", "{broken"),
            Message::assistant("That call failed; nothing else to do."),
        ];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "read something", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::NoFurtherCalls);

        let tool_msg = conv.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_msg.content.contains("Error"));
    }

    #[tokio::test]
    async fn pre_cancelled_turn_stops_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_in(&dir, vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut conv = Conversation::new();

        let outcome = agent.run_turn(&mut conv, "anything", &cancel).await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.iterations, 0);
        // User message is preserved for the next turn
        assert_eq!(conv.messages.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_turn_leaves_session_usable() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![Message::assistant("All done.")];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = agent.run_turn(&mut conv, "first", &cancel).await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);

        // A fresh token on the next turn runs normally on the same conversation.
        let outcome =
            agent.run_turn(&mut conv, "second", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::NoFurtherCalls);
        assert!(outcome.text.contains("All done"));
        assert!(conv.pairing_intact());
    }

    #[tokio::test]
    async fn provider_failure_preserves_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_in(&dir, vec![]); // empty script -> Network error
        let mut conv = Conversation::new();
        conv.push(Message::system("rules"));

        let err = agent.run_turn(&mut conv, "hello", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(conv.messages.len(), 2); // system + user still present
    }

    #[tokio::test]
    async fn trivial_edit_guard_stops_whitespace_churn() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "a = 1\n").unwrap();

        let edit = |id: &str, from: &str, to: &str| {
            assistant_with_call(
                "Let me adjust the formatting.",
                id,
                "edit_file",
                &format!(
                    r#"{{"file_path":"app.py","original_snippet":"{from}","new_snippet":"{to}"}}"#
                ),
            )
        };
        let script = vec![
            edit("call_1", "a = 1", "a  = 1"),
            edit("call_2", "a  = 1", "a   = 1"),
            edit("call_3", "a   = 1", "a    = 1"),
        ];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "tidy app.py", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::Completed);
        assert_eq!(outcome.iterations, 3);
    }

    #[tokio::test]
    async fn fix_scenario_settles_on_clean_recheck() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.txt"), "bad1\nbad2\n").unwrap();

        let script = vec![
            assistant_with_call(
                "Now I will fix the two issues.",
                "call_1",
                "read_file",
                r#"{"file_path":"app.txt"}"#,
            ),
            assistant_with_call(
                "I'll apply the second fix next.",
                "call_2",
                "edit_file",
                r#"{"file_path":"app.txt","original_snippet":"bad1","new_snippet":"good1"}"#,
            ),
            assistant_with_call(
                "Let me re-check the file.",
                "call_3",
                "edit_file",
                r#"{"file_path":"app.txt","original_snippet":"bad2","new_snippet":"good2"}"#,
            ),
            assistant_with_call(
                "Both issues are fixed and the file is clean.",
                "call_4",
                "read_file",
                r#"{"file_path":"app.txt"}"#,
            ),
        ];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "fix app.txt", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::Completed);
        assert_eq!(outcome.iterations, 4);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("app.txt")).unwrap(),
            "good1\ngood2\n"
        );
        assert!(conv.pairing_intact());
    }

    #[tokio::test]
    async fn missing_checker_never_blocks_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        // Whether flake8 is installed or not, the turn must finish without
        // an error: findings and synthetic warnings both just feed back.
        let script = vec![
            assistant_with_call(
                "Writing the script.",
                "call_1",
                "create_file",
                r#"{"file_path":"tool.py","content":"print('ok')\n"}"#,
            ),
            Message::assistant("The script is written."),
        ];
        let agent = agent_in(&dir, script);
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "write tool.py", &CancellationToken::new()).await.unwrap();
        assert!(matches!(
            outcome.reason,
            StopReason::Completed | StopReason::NoFurtherCalls
        ));
        assert!(dir.path().join("tool.py").exists());
    }

    #[tokio::test]
    async fn namespaced_call_routes_to_external_client() {
        struct EchoClient;

        #[async_trait]
        impl ExternalToolClient for EchoClient {
            async fn invoke(
                &self,
                server: &str,
                tool: &str,
                arguments: serde_json::Value,
            ) -> Result<String, ToolError> {
                Ok(format!("{server}/{tool}: {arguments}"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            assistant_with_call(
                "Checking the docs.",
                "call_1",
                "context7__search_docs",
                r#"{"query":"tokio"}"#,
            ),
            Message::assistant("Found it."),
        ];
        let agent = agent_in(&dir, script).with_external(Arc::new(EchoClient));
        let mut conv = Conversation::new();

        let outcome =
            agent.run_turn(&mut conv, "look up tokio", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.reason, StopReason::NoFurtherCalls);

        let tool_msg = conv.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_msg.content.contains("context7/search_docs"));
    }

    #[test]
    fn whitespace_only_detection() {
        assert!(whitespace_only_change("a=1", "a = 1"));
        assert!(whitespace_only_change("x\ny", "x y"));
        assert!(!whitespace_only_change("a = 1", "a = 2"));
    }

    #[test]
    fn unfinished_cues() {
        assert!(signals_unfinished("Now I need to update the tests."));
        assert!(signals_unfinished("I'll fix the import next."));
        assert!(!signals_unfinished("All done. The bug was a typo."));
    }
}
