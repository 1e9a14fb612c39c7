//! Diagnostic domain types — one value per static-analysis finding.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How serious a finding is. Checkers that don't distinguish map to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single static-analysis finding about a source file.
///
/// Line and column are 1-based; column is optional because not every checker
/// reports one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub severity: Severity,
    /// Checker-specific identifier, e.g. "F401" or "TS2304".
    pub code: String,
    pub message: String,
    /// Which checker produced this finding.
    pub tool: String,
}

impl Diagnostic {
    /// A synthetic warning describing a checker-availability problem
    /// (missing binary, timeout, unreadable output). The loop must keep
    /// going when a checker is not installed, so this is never an error.
    pub fn checker_unavailable(path: impl Into<PathBuf>, tool: &str, detail: &str) -> Self {
        Self {
            path: path.into(),
            line: 1,
            column: None,
            severity: Severity::Warning,
            code: "checker-unavailable".into(),
            message: format!("{tool} could not be run: {detail}"),
            tool: tool.into(),
        }
    }

    /// Render in the conventional `path:line:col: severity code message` shape.
    pub fn render(&self) -> String {
        match self.column {
            Some(col) => format!(
                "{}:{}:{}: {} {} {}",
                self.path.display(),
                self.line,
                col,
                self.severity,
                self.code,
                self.message
            ),
            None => format!(
                "{}:{}: {} {} {}",
                self.path.display(),
                self.line,
                self.severity,
                self.code,
                self.message
            ),
        }
    }
}
