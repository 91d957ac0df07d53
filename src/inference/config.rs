//! Client configuration loading.
//!
//! Reads `ollama-research.yaml` and resolves environment variables. Every
//! field has a default, so a missing file yields a client pointed at the
//! stock local Ollama port.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::errors::InferenceError;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "ollama-research.yaml";

/// Environment variable that points directly at a config file.
pub const CONFIG_ENV_VAR: &str = "OLLAMA_RESEARCH_CONFIG";

/// Default inference server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ─── Public Types ────────────────────────────────────────────────────────────

/// How streamed output is shown while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Live display when stdout is a terminal, quiet otherwise.
    #[default]
    Auto,
    /// Always redraw the streamed text in place.
    Live,
    /// Never write streamed text to the terminal.
    Quiet,
}

/// Runtime configuration for [`InferenceClient`](super::InferenceClient).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, e.g. `http://localhost:11434` (no `/api` suffix).
    pub base_url: String,
    /// Model used when the caller does not name one.
    pub model: String,
    /// Username recorded with each interaction.
    pub username: String,
    pub connect_timeout_secs: u64,
    /// Upper bound on one whole generate exchange, including streaming.
    pub request_timeout_secs: u64,
    /// Maximum live display redraws per second.
    pub refresh_per_second: u32,
    /// Wrap width for the live display. `None` uses the terminal width.
    pub display_width: Option<usize>,
    pub display: DisplayMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "llama3".to_string(),
            username: "default".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 180,
            refresh_per_second: 10,
            display_width: None,
            display: DisplayMode::Auto,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load the config found from `start`, or defaults when there is none.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(start: &Path) -> Result<Self, InferenceError> {
        match find_config_path(start) {
            Some(path) => load_client_config(&path),
            None => {
                tracing::debug!(start = %start.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn normalize(mut self) -> Result<Self, InferenceError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "base_url must not be empty".into(),
            });
        }
        self.base_url = trimmed.to_string();
        if self.refresh_per_second == 0 {
            return Err(InferenceError::ConfigError {
                reason: "refresh_per_second must be at least 1".into(),
            });
        }
        Ok(self)
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `OLLAMA_RESEARCH_CONFIG` first, then searches upward from `start`
/// for `ollama-research.yaml`.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(path);
        if candidate.is_file() {
            return Some(candidate);
        }
        tracing::warn!(
            path = %candidate.display(),
            "{CONFIG_ENV_VAR} does not point at a file, ignoring"
        );
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse a client configuration file.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}` before parsing.
pub fn load_client_config(path: &Path) -> Result<ClientConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_client_config(&raw)
}

/// Parse config YAML text (after env interpolation).
pub fn parse_client_config(raw: &str) -> Result<ClientConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);

    // An empty or comment-only file deserializes to `null`.
    if interpolated.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with('#')
    }) {
        return ClientConfig::default().normalize();
    }

    let config: ClientConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
            reason: format!("failed to parse config: {e}"),
        })?;

    config.normalize()
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
///
/// An unset variable without a default expands to nothing. An unterminated
/// `${` takes the rest of the input as its expression.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').unwrap_or(tail.len());
        result.push_str(&resolve_var_expr(&tail[..end]));
        rest = tail.get(end + 1..).unwrap_or("");
    }

    result.push_str(rest);
    result
}

/// Resolve `VAR` or `VAR:-default`. As in the shell, an empty value takes
/// the default too.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name)
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand `~` or a leading `~/` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => path.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
