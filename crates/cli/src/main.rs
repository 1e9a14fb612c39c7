//! codewright — a terminal coding assistant.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codewright", version, about = "AI pair programmer for your terminal")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a chat session (interactive unless -m is given)
    Chat {
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,

        /// Model id from the catalog (see `codewright models`)
        #[arg(long)]
        model: Option<String>,

        /// Project root the assistant may touch (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Override the per-turn iteration bound
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// List the models in the catalog
    Models,

    /// Check checker binaries and API keys in this environment
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("codewright=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codewright=warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let result = match cli.command {
        Command::Chat { message, model, root, max_iterations } => {
            commands::chat::run(commands::chat::ChatOptions {
                message,
                model,
                root,
                max_iterations,
            })
            .await
        }
        Command::Models => commands::models::run(),
        Command::Doctor => commands::doctor::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
