//! Application configuration loading.
//!
//! Reads `airspace-copilot.yaml` (if one can be found), resolves `${VAR}` /
//! `${VAR:-default}` references, then applies environment overrides. Every
//! field has a built-in default, so running without a config file is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "airspace-copilot.yaml";

/// Env var pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "AIRSPACE_COPILOT_CONFIG";

/// Env var overriding `model.model_name`.
pub const MODEL_OVERRIDE_ENV: &str = "AIRSPACE_COPILOT_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    Parse { reason: String },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `airspace-copilot.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub regions: RegionsConfig,
    pub agent: AgentConfig,
}

/// Completion-service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// OpenAI-compatible base URL (`…/v1`).
    pub base_url: String,
    pub model_name: String,
    /// Name of the env var holding the bearer token.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model_name: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            request_timeout_secs: 60,
        }
    }
}

/// Region → snapshot endpoint mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    /// Region used when a tool call or CLI command omits one.
    pub default_region: String,
    /// Ordered so that error messages list regions deterministically.
    pub endpoints: BTreeMap<String, String>,
    pub fetch_timeout_secs: u64,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "region1".to_string(),
            "http://localhost:5678/webhook/latest-region1".to_string(),
        );
        Self {
            default_region: "region1".to_string(),
            endpoints,
            fetch_timeout_secs: 10,
        }
    }
}

impl RegionsConfig {
    pub fn endpoint(&self, region: &str) -> Option<&str> {
        self.endpoints.get(region).map(String::as_str)
    }

    pub fn known_regions(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }
}

/// Agent-loop execution knobs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Execute a batch of tool calls concurrently. Results keep call order.
    pub parallel_tool_execution: bool,
    /// One deadline shared by every stage of a request. `None` disables it.
    pub deadline_secs: Option<u64>,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Order: explicit path, `AIRSPACE_COPILOT_CONFIG`, then an upward search from
/// `start`. Returns `None` when nothing is found (defaults apply).
pub fn find_config_path(explicit: Option<&Path>, start: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(expand_tilde(&path)));
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load configuration, falling back to defaults when `path` is `None`.
///
/// Env overrides are applied in both cases.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            parse_config(&raw)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    tracing::debug!(
        config_path = ?path.map(|p| p.display().to_string()),
        model = %config.model.model_name,
        regions = ?config.regions.known_regions(),
        "configuration loaded"
    );

    Ok(config)
}

/// Parse YAML text after env-var interpolation.
pub fn parse_config(raw: &str) -> Result<AppConfig, ConfigError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })
}

/// Apply `<REGION>_WEBHOOK` and model overrides.
///
/// `lookup` abstracts the environment so tests stay hermetic.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (region, url) in config.regions.endpoints.iter_mut() {
        let key = format!("{}_WEBHOOK", env_key(region));
        if let Some(value) = lookup(&key).filter(|v| !v.trim().is_empty()) {
            *url = value;
        }
    }

    if let Some(model) = lookup(MODEL_OVERRIDE_ENV).filter(|v| !v.trim().is_empty()) {
        config.model.model_name = model;
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.regions.endpoints.is_empty() {
        return Err(ConfigError::Invalid {
            reason: "no regions configured".into(),
        });
    }
    if config.regions.endpoint(&config.regions.default_region).is_none() {
        return Err(ConfigError::Invalid {
            reason: format!(
                "default region '{}' has no endpoint",
                config.regions.default_region
            ),
        });
    }
    Ok(())
}

/// `region-1` → `REGION_1`.
fn env_key(region: &str) -> String {
    region
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
