//! Agent configuration: JSON settings file plus environment overrides.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Command-line flags (applied in `main`)
//! 2. Environment variable overrides (e.g. `VIGIL_API_KEY`)
//! 3. Values in the settings file
//! 4. Built-in defaults
//!
//! The settings file keeps the legacy PascalCase key spellings (`ApiKey`,
//! `Rules`) as accepted aliases so configs written by earlier releases of
//! the companion settings UI still load.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment-variable names for overrides.
const ENV_API_KEY: &str = "VIGIL_API_KEY";
const ENV_MODEL: &str = "VIGIL_MODEL";
const ENV_RULES: &str = "VIGIL_RULES";
const ENV_INTERVAL_SECS: &str = "VIGIL_INTERVAL_SECS";
const ENV_ENDPOINT: &str = "VIGIL_ENDPOINT";

/// Default judge model.
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Default sampling cadence in seconds.
const DEFAULT_INTERVAL_SECS: u64 = 45;
/// Default cycle timeout in seconds.
const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 30;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_cycle_timeout() -> u64 {
    DEFAULT_CYCLE_TIMEOUT_SECS
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Judge backend API key. Required.
    #[serde(alias = "ApiKey")]
    pub api_key: String,
    /// User-declared rule the judge enforces.
    #[serde(default, alias = "Rules")]
    pub rules: String,
    /// Judge model identifier.
    #[serde(default = "default_model", alias = "Model")]
    pub model: String,
    /// Seconds between the start of consecutive sampling cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Seconds before an in-flight capture+judge phase is abandoned.
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,
    /// Judge API base URL override (None = public Gemini endpoint).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Screenshot command override; the output path is appended as the
    /// final argument. None = platform default.
    #[serde(default)]
    pub capture_command: Option<Vec<String>>,
    /// Notification command override; summary and body are appended.
    #[serde(default)]
    pub notify_command: Option<Vec<String>>,
    /// Screen-lock command override.
    #[serde(default)]
    pub lock_command: Option<Vec<String>>,
}

impl AgentConfig {
    /// Load the settings file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Settings not found at {}. Run the settings UI (or create the file) \
                 and set an API key first.",
                path.display()
            )
        })?;
        let mut config: AgentConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            self.model = model;
        }
        if let Ok(rules) = std::env::var(ENV_RULES) {
            self.rules = rules;
        }
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }
        if let Ok(secs) = std::env::var(ENV_INTERVAL_SECS) {
            match secs.parse() {
                Ok(secs) => self.interval_secs = secs,
                Err(_) => tracing::warn!(value = %secs, "Ignoring non-numeric {ENV_INTERVAL_SECS}"),
            }
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.api_key.is_empty(), "API key must not be empty");
        anyhow::ensure!(self.interval_secs > 0, "interval_secs must be nonzero");
        anyhow::ensure!(
            self.cycle_timeout_secs > 0,
            "cycle_timeout_secs must be nonzero"
        );
        Ok(())
    }
}
