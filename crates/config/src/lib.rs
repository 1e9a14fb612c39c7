//! Configuration loading and validation for codewright.
//!
//! Settings come from `~/.codewright/config.toml` (or a project-local
//! `codewright.toml`) with environment variable overrides. The model and
//! provider catalog lives in [`catalog`]; runtime knobs live in
//! [`AppConfig`].

pub mod catalog;

pub use catalog::{Catalog, DEFAULT_MODEL, ModelEntry, ProviderEntry, ResolvedModel};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("{env_var} is not set (required for {provider})")]
    MissingApiKey { provider: String, env_var: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl From<ConfigError> for codewright_core::Error {
    fn from(e: ConfigError) -> Self {
        codewright_core::Error::Config { message: e.to_string() }
    }
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default model id (must exist in the catalog).
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Iteration bound for one agent turn.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Conversation prune threshold (non-system message count).
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Size ceiling for file reads and writes, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Per-checker deadline, in seconds.
    #[serde(default = "default_checker_timeout_secs")]
    pub checker_timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_max_iterations() -> u32 {
    10
}
fn default_max_messages() -> usize {
    40
}
fn default_max_file_bytes() -> u64 {
    5_000_000
}
fn default_checker_timeout_secs() -> u64 {
    15
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            max_iterations: default_max_iterations(),
            max_messages: default_max_messages(),
            max_file_bytes: default_max_file_bytes(),
            checker_timeout_secs: default_checker_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// `~/.codewright`
    pub fn config_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".into());
        Path::new(&home).join(".codewright")
    }

    /// Load configuration: project-local `codewright.toml` wins, then the
    /// user config file, then built-in defaults. `CODEWRIGHT_MODEL` (or the
    /// legacy `LLM_MODEL`) overrides the model in all cases.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_layered(
            Path::new("codewright.toml"),
            &Self::config_dir().join("config.toml"),
        )?;

        if let Ok(model) = std::env::var("CODEWRIGHT_MODEL").or_else(|_| std::env::var("LLM_MODEL"))
            && !model.is_empty()
        {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Project config shadows the user config entirely; the user file is
    /// only touched (and only then parsed) when no project file exists.
    fn load_layered(project: &Path, user: &Path) -> Result<Self, ConfigError> {
        if let Some(config) = Self::load_file(project)? {
            return Ok(config);
        }
        Ok(Self::load_file(user)?.unwrap_or_default())
    }

    fn load_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { path: path.into(), source: e })?;
        let config = toml::from_str(&text)
            .map_err(|e| ConfigError::Parse { path: path.into(), source: e })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(Some(config))
    }
}
