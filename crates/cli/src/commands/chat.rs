//! `codewright chat` — the interactive session.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use codewright_agent::{AgentLoop, SYSTEM_PROMPT, TurnOutcome};
use codewright_config::{AppConfig, Catalog};
use codewright_core::{Conversation, Error, Message, StopReason};
use codewright_diagnostics::DiagnosticsRunner;
use codewright_providers::build_provider;
use codewright_tools::ToolDispatcher;
use codewright_workspace::Workspace;

pub struct ChatOptions {
    pub message: Option<String>,
    pub model: Option<String>,
    pub root: Option<PathBuf>,
    pub max_iterations: Option<u32>,
}

pub async fn run(options: ChatOptions) -> Result<(), Error> {
    let config = AppConfig::load().map_err(Error::from)?;
    let catalog = Catalog::builtin();

    let model_id = options.model.unwrap_or_else(|| config.default_model.clone());
    let resolved = catalog.resolve(&model_id).map_err(Error::from)?;
    let provider = build_provider(&resolved);

    let root = match options.root {
        Some(root) => root,
        None => std::env::current_dir()
            .map_err(|e| Error::Internal(format!("cannot determine working directory: {e}")))?,
    };
    info!(model = %model_id, root = %root.display(), "Starting session");

    let workspace = Workspace::new(&root).with_max_file_bytes(config.max_file_bytes);
    let diagnostics =
        DiagnosticsRunner::new().with_timeout(Duration::from_secs(config.checker_timeout_secs));
    let dispatcher = ToolDispatcher::new(workspace, diagnostics);

    let agent = AgentLoop::new(provider, &resolved.model.id, dispatcher)
        .with_max_iterations(options.max_iterations.unwrap_or(config.max_iterations));

    let mut conversation = Conversation::with_max_messages(config.max_messages);
    conversation.push(Message::system(SYSTEM_PROMPT));

    if let Some(message) = options.message {
        let outcome = run_interruptible(&agent, &mut conversation, &message).await?;
        print_outcome(&outcome);
        return Ok(());
    }

    println!("codewright · {} · root {}", resolved.model.display_name, root.display());
    println!("Type a request, or 'exit' to quit.\n");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await.ok();
        stdout.flush().await.ok();

        // Ctrl+C at the prompt ends the session.
        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => break, // EOF
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match run_interruptible(&agent, &mut conversation, line).await {
            Ok(outcome) => print_outcome(&outcome),
            // Provider failures end the turn, not the session.
            Err(e) => eprintln!("error: {e}"),
        }
    }

    println!("bye");
    Ok(())
}

/// Run one turn under a fresh cancellation token. Ctrl+C mid-turn cancels
/// the token and waits for the loop to stop at its next iteration boundary,
/// leaving the conversation usable for the next turn.
async fn run_interruptible(
    agent: &AgentLoop,
    conversation: &mut Conversation,
    message: &str,
) -> Result<TurnOutcome, Error> {
    let cancel = CancellationToken::new();
    let outcome = {
        let turn = agent.run_turn(conversation, message, &cancel);
        tokio::pin!(turn);

        tokio::select! {
            outcome = &mut turn => outcome,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                turn.await
            }
        }
    };
    info!(
        messages = conversation.messages.len(),
        approx_tokens = conversation.estimated_tokens(),
        "Turn finished"
    );
    outcome
}

fn print_outcome(outcome: &TurnOutcome) {
    if !outcome.text.is_empty() {
        println!("\n{}\n", outcome.text);
    }
    match outcome.reason {
        StopReason::Exhausted => {
            eprintln!("(iteration limit reached after {} rounds)", outcome.iterations)
        }
        StopReason::Cancelled => eprintln!("(cancelled)"),
        _ => {}
    }
}
