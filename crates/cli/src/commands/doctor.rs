//! `codewright doctor` — environment checks.
//!
//! Reports which checker binaries are on PATH and which provider API keys
//! are set. Nothing here is fatal; missing checkers degrade to synthetic
//! warnings at runtime.

use std::path::Path;

use codewright_config::Catalog;
use codewright_core::Error;

pub fn run() -> Result<(), Error> {
    println!("Checker binaries:");
    for binary in ["flake8", "npx"] {
        let note = match binary {
            "npx" => " (runs eslint and tsc)",
            _ => "",
        };
        match find_in_path(binary) {
            Some(path) => println!("  ok       {binary}{note} -> {}", path.display()),
            None => println!("  missing  {binary}{note}"),
        }
    }

    println!("\nAPI keys:");
    let catalog = Catalog::builtin();
    let mut providers: Vec<_> = catalog.providers.values().collect();
    providers.sort_by(|a, b| a.name.cmp(&b.name));
    for provider in providers {
        let set = std::env::var(&provider.api_key_env).is_ok_and(|v| !v.is_empty());
        let status = if set { "set" } else { "missing" };
        println!("  {status:<8} {} ({})", provider.api_key_env, provider.name);
    }

    Ok(())
}

/// Locate an executable on PATH.
fn find_in_path(binary: &str) -> Option<std::path::PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(binary);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
