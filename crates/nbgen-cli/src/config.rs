//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nbgen_agent::interaction_log::DEFAULT_LOG_DIR;
use nbgen_ai::providers::{get_api_key, openrouter::DEFAULT_BASE_URL};

/// Model used when neither the command line nor the config file names one
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.7-sonnet";

/// Interpreter used to run generated scripts
pub const DEFAULT_PYTHON: &str = "python3";

/// Env file consulted last for the API key
pub const DOTENV_FILE: &str = ".env";

/// Configuration for dandi-notebook-gen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model to use
    pub model: Option<String>,
    /// Completion endpoint base URL
    pub base_url: Option<String>,
    /// Directory for interaction logs
    pub log_dir: Option<PathBuf>,
    /// Upper bound on completion requests per run
    pub max_iterations: Option<u32>,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// OpenRouter API key (alternative to OPENROUTER_API_KEY)
    pub api_key: Option<String>,
    /// Python interpreter for `--run`
    pub python: Option<String>,
}

/// Effective settings after applying defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: String,
    pub base_url: String,
    pub log_dir: PathBuf,
    pub max_iterations: Option<u32>,
    pub request_timeout: Option<Duration>,
    pub api_key: Option<String>,
    pub python: String,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dandi-notebook-gen")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for NBGEN_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("NBGEN_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location. A missing or unreadable file
    /// yields the defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        Self::init_at(&path)?;
        Ok(path)
    }

    /// Write the default config to `path` unless a file is already there
    pub fn init_at(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            return Ok(());
        }

        let default_config = Config {
            model: Some(DEFAULT_MODEL.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            max_iterations: None,
            request_timeout_secs: None,
            api_key: None,
            python: Some(DEFAULT_PYTHON.to_string()),
        };
        default_config.save_to(path)
    }

    /// Fill every unset field with its built-in default
    pub fn settings(&self) -> Settings {
        Settings {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            log_dir: self
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            max_iterations: self.max_iterations,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            api_key: self.api_key.clone(),
            python: self
                .python
                .clone()
                .unwrap_or_else(|| DEFAULT_PYTHON.to_string()),
        }
    }
}

impl Settings {
    /// Resolve the API key: the config file's `api_key`, then the process
    /// environment, then `env_var` in the `dotenv` file.
    pub fn resolve_api_key(&self, env_var: &str, dotenv: &Path) -> nbgen_ai::Result<String> {
        match get_api_key(self.api_key.as_deref(), env_var) {
            Err(nbgen_ai::Error::AuthenticationMissing) => {
                dotenv_value(dotenv, env_var).ok_or(nbgen_ai::Error::AuthenticationMissing)
            }
            other => other,
        }
    }
}

/// First non-blank value of `key` in an env file
fn dotenv_value(path: &Path, key: &str) -> Option<String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            if !e.not_found() {
                tracing::warn!(path = %path.display(), "Failed to read env file: {}", e);
            }
            return None;
        }
    };

    for entry in entries {
        match entry {
            Ok((name, value)) if name == key => {
                return Some(value).filter(|v| !v.trim().is_empty());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "Malformed env file: {}", e);
                return None;
            }
        }
    }
    None
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# dandi-notebook-gen configuration file
# Place at ~/.config/dandi-notebook-gen/config.toml (Linux), or point
# NBGEN_CONFIG_PATH at another file.

# OpenRouter model id
model = "anthropic/claude-3.7-sonnet"

# Completion endpoint
base_url = "https://openrouter.ai/api/v1"

# Where interaction logs are written
log_dir = "logs"

# Stop after this many completion requests (unbounded when unset)
# max_iterations = 50

# HTTP request timeout in seconds (no timeout when unset)
# request_timeout_secs = 300

# Interpreter used by --run
python = "python3"

# API key (optional - OPENROUTER_API_KEY from the environment or ./.env
# is used when unset)
# It's recommended to use the environment variable instead
# api_key = "sk-or-..."
"#
}
