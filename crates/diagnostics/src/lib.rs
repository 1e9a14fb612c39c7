//! Static-analysis runners.
//!
//! Given a file path, the runner selects the checker set by extension, runs
//! each checker as an isolated subprocess under a deadline, and parses the
//! output into a uniform diagnostic list. Checker availability varies by
//! environment, so a missing binary, a timeout, or unusable output degrades
//! to a single synthetic warning — the agent loop must keep going when a
//! linter is not installed.
//!
//! Non-zero exit is *not* an error signal on its own: linters exit non-zero
//! whenever they have findings.

pub mod parse;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, trace};

use codewright_core::Diagnostic;

/// Default per-checker deadline.
pub const DEFAULT_CHECKER_TIMEOUT: Duration = Duration::from_secs(15);

/// One enumerated external checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checker {
    /// PEP8-style linting for Python.
    Flake8,
    /// Style linting for JavaScript and TypeScript.
    Eslint,
    /// Type checking for TypeScript.
    Tsc,
}

impl Checker {
    pub const ALL: [Checker; 3] = [Checker::Flake8, Checker::Eslint, Checker::Tsc];

    pub fn name(&self) -> &'static str {
        match self {
            Checker::Flake8 => "flake8",
            Checker::Eslint => "eslint",
            Checker::Tsc => "tsc",
        }
    }

    /// Program + arguments to invoke for `path`. eslint and tsc go through
    /// npx so project-local installs are picked up.
    pub fn command_line(&self, path: &Path) -> (&'static str, Vec<String>) {
        let p = path.display().to_string();
        match self {
            Checker::Flake8 => ("flake8", vec![p]),
            Checker::Eslint => ("npx", vec!["eslint".into(), "--format".into(), "compact".into(), p]),
            Checker::Tsc => (
                "npx",
                vec!["tsc".into(), "--noEmit".into(), "--skipLibCheck".into(), p],
            ),
        }
    }

    fn parse(&self, stdout: &str) -> Vec<Diagnostic> {
        match self {
            Checker::Flake8 => parse::parse_flake8(stdout),
            Checker::Eslint => parse::parse_eslint(stdout),
            Checker::Tsc => parse::parse_tsc(stdout),
        }
    }
}

/// The checker set for a file, selected by extension. A language may have
/// more than one checker; their outputs are concatenated in this order.
pub fn checkers_for(path: &Path) -> &'static [Checker] {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => &[Checker::Flake8],
        Some("js") | Some("jsx") => &[Checker::Eslint],
        Some("ts") | Some("tsx") => &[Checker::Tsc, Checker::Eslint],
        _ => &[],
    }
}

/// Whether any checker is configured for this file type.
pub fn is_supported(path: &Path) -> bool {
    !checkers_for(path).is_empty()
}

/// Runs the per-language checkers for a file.
#[derive(Debug, Clone)]
pub struct DiagnosticsRunner {
    timeout: Duration,
}

impl DiagnosticsRunner {
    pub fn new() -> Self {
        Self { timeout: DEFAULT_CHECKER_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Analyze one file. Unknown extensions yield an empty list.
    pub async fn analyze(&self, path: &Path) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for checker in checkers_for(path) {
            let found = self.run_checker(*checker, path).await;
            debug!(
                checker = checker.name(),
                path = %path.display(),
                count = found.len(),
                "Checker finished"
            );
            diagnostics.extend(found);
        }
        diagnostics
    }

    async fn run_checker(&self, checker: Checker, path: &Path) -> Vec<Diagnostic> {
        let (program, args) = checker.command_line(path);
        self.run_program(program, &args, checker, path).await
    }

    async fn run_program(
        &self,
        program: &str,
        args: &[String],
        checker: Checker,
        path: &Path,
    ) -> Vec<Diagnostic> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(c) => c,
            Err(e) => {
                // Typically the binary is not installed on this machine
                return vec![Diagnostic::checker_unavailable(path, checker.name(), &e.to_string())];
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return vec![Diagnostic::checker_unavailable(path, checker.name(), &e.to_string())];
            }
            Err(_) => {
                return vec![Diagnostic::checker_unavailable(
                    path,
                    checker.name(),
                    &format!("timed out after {:?}", self.timeout),
                )];
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings = checker.parse(&stdout);
        if !findings.is_empty() {
            return findings;
        }

        // Clean stdout + success exit is the "no findings" case. A failing
        // exit with nothing parseable usually means a configuration problem
        // (eslint without a config, npx fetch failure) — degrade, don't die.
        if output.status.success() || !stdout.trim().is_empty() {
            trace!(checker = checker.name(), "No findings");
            return Vec::new();
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().is_empty() {
            return Vec::new();
        }
        let detail: String = stderr.trim().chars().take(200).collect();
        vec![Diagnostic::checker_unavailable(path, checker.name(), &detail)]
    }
}

impl Default for DiagnosticsRunner {
    fn default() -> Self {
        Self::new()
    }
}
