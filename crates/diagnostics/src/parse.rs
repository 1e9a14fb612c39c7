//! Checker-output parsers.
//!
//! Each checker has its own line format; all three parse into the same
//! [`Diagnostic`] shape. Unrecognized lines are skipped rather than
//! reported — linters mix findings with summaries and progress noise.

use codewright_core::{Diagnostic, Severity};

/// flake8 default format: `path:line:col: CODE message`.
///
/// `W`-prefixed codes are pycodestyle warnings; everything else (E, F, C)
/// is treated as an error.
pub fn parse_flake8(output: &str) -> Vec<Diagnostic> {
    output.lines().filter_map(parse_flake8_line).collect()
}

fn parse_flake8_line(line: &str) -> Option<Diagnostic> {
    let mut parts = line.splitn(4, ':');
    let path = parts.next()?.trim();
    let line_no: u32 = parts.next()?.trim().parse().ok()?;
    let column: Option<u32> = parts.next()?.trim().parse().ok();
    let rest = parts.next()?.trim();

    let (code, message) = rest.split_once(' ')?;
    if path.is_empty() || code.is_empty() {
        return None;
    }

    let severity = if code.starts_with('W') {
        Severity::Warning
    } else {
        Severity::Error
    };

    Some(Diagnostic {
        path: path.into(),
        line: line_no,
        column,
        severity,
        code: code.into(),
        message: message.trim().into(),
        tool: "flake8".into(),
    })
}

/// eslint `--format compact`:
/// `path: line N, col M, Severity - message (rule-id)`.
pub fn parse_eslint(output: &str) -> Vec<Diagnostic> {
    output.lines().filter_map(parse_eslint_line).collect()
}

fn parse_eslint_line(line: &str) -> Option<Diagnostic> {
    let (path, rest) = line.split_once(": line ")?;
    let (line_no, rest) = rest.split_once(',')?;
    let line_no: u32 = line_no.trim().parse().ok()?;

    // "col M, " is present in practice but the parser tolerates its absence
    let (column, rest) = match rest.trim_start().strip_prefix("col ") {
        Some(after_col) => {
            let (col, tail) = after_col.split_once(',')?;
            (col.trim().parse().ok(), tail)
        }
        None => (None, rest),
    };

    let (severity_word, message) = rest.trim_start().split_once(" - ")?;
    let severity = match severity_word.trim() {
        "Warning" => Severity::Warning,
        "Error" => Severity::Error,
        _ => return None,
    };

    // Trailing "(rule-id)" becomes the code when present
    let message = message.trim();
    let (message, code) = match message.rsplit_once(" (") {
        Some((msg, rule)) if rule.ends_with(')') => {
            (msg.trim(), rule.trim_end_matches(')').to_string())
        }
        _ => (message, "eslint".to_string()),
    };

    Some(Diagnostic {
        path: path.trim().into(),
        line: line_no,
        column,
        severity,
        code,
        message: message.into(),
        tool: "eslint".into(),
    })
}

/// tsc: `path(line,col): error TSnnnn: message`.
pub fn parse_tsc(output: &str) -> Vec<Diagnostic> {
    output.lines().filter_map(parse_tsc_line).collect()
}

fn parse_tsc_line(line: &str) -> Option<Diagnostic> {
    let (location, rest) = line.split_once("): ")?;
    let (path, pos) = location.split_once('(')?;

    let (line_no, column) = match pos.split_once(',') {
        Some((l, c)) => (l.trim().parse().ok()?, c.trim().parse().ok()),
        None => (pos.trim().parse().ok()?, None),
    };

    let (severity_word, rest) = rest.split_once(' ')?;
    let severity = match severity_word {
        "error" => Severity::Error,
        "warning" => Severity::Warning,
        _ => return None,
    };

    let (code, message) = rest.split_once(": ")?;

    Some(Diagnostic {
        path: path.trim().into(),
        line: line_no,
        column,
        severity,
        code: code.trim().into(),
        message: message.trim().into(),
        tool: "tsc".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flake8_error_and_warning() {
        let out = "app.py:3:1: F401 'os' imported but unused\n\
                   app.py:7:1: W291 trailing whitespace\n";
        let diags = parse_flake8(out);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].code, "F401");
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].line, 3);
        assert_eq!(diags[0].column, Some(1));
        assert_eq!(diags[1].severity, Severity::Warning);
    }

    #[test]
    fn flake8_skips_noise_lines() {
        let diags = parse_flake8("some random output\n\napp.py:bad:1: E1 x\n");
        assert!(diags.is_empty());
    }

    #[test]
    fn eslint_compact_with_rule() {
        let out = "/srv/app.js: line 10, col 5, Error - 'x' is defined but never used. (no-unused-vars)";
        let diags = parse_eslint(out);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 10);
        assert_eq!(diags[0].column, Some(5));
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code, "no-unused-vars");
        assert_eq!(diags[0].message, "'x' is defined but never used.");
    }

    #[test]
    fn eslint_warning_without_rule() {
        let out = "app.js: line 2, col 1, Warning - Unexpected console statement.";
        let diags = parse_eslint(out);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].code, "eslint");
    }

    #[test]
    fn eslint_skips_summary_line() {
        let diags = parse_eslint("2 problems");
        assert!(diags.is_empty());
    }

    #[test]
    fn tsc_error_line() {
        let out = "src/index.ts(10,5): error TS2304: Cannot find name 'foo'.";
        let diags = parse_tsc(out);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].path.to_str().unwrap(), "src/index.ts");
        assert_eq!(diags[0].line, 10);
        assert_eq!(diags[0].column, Some(5));
        assert_eq!(diags[0].code, "TS2304");
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn tsc_tolerates_missing_column() {
        let out = "src/index.ts(4): error TS1005: ';' expected.";
        let diags = parse_tsc(out);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].column, None);
        assert_eq!(diags[0].line, 4);
    }
}
