//! Per-turn loop state.

use serde::{Deserialize, Serialize};

/// Why an agent turn stopped.
///
/// Fatal provider or configuration failures are `Err` values on the turn
/// itself, never a stop reason: a stop reason always comes with usable
/// assistant text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The loop judged the work settled (no diagnostics, no continuation cue).
    Completed,
    /// The assistant answered without requesting any tool calls.
    NoFurtherCalls,
    /// The iteration bound was hit before the work settled.
    Exhausted,
    /// The user cancelled mid-turn; the conversation is intact.
    Cancelled,
}

/// Bookkeeping for one iteration of the loop.
#[derive(Debug, Clone, Default)]
pub struct IterationState {
    /// 1-based iteration number.
    pub iteration: u32,
    pub had_tool_calls: bool,
    /// Whether any checker finding (error or warning) was attached.
    pub diagnostics_reported: bool,
    pub reason: Option<StopReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_serializes_snake_case() {
        let json = serde_json::to_string(&StopReason::NoFurtherCalls).unwrap();
        assert_eq!(json, r#""no_further_calls""#);
    }
}
