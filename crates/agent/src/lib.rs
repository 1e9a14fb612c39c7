//! # codewright Agent
//!
//! The iteration state machine that turns one user message into a finished
//! edit session: model call, ordered tool dispatch, diagnostic feedback,
//! and a bounded continue/stop policy.

pub mod loop_runner;
pub mod prompt;

pub use loop_runner::{AgentLoop, DEFAULT_MAX_ITERATIONS, TurnOutcome};
pub use prompt::SYSTEM_PROMPT;
