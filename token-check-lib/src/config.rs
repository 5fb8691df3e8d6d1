//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `TC_*`
//! environment variables, and merging file configurations with proper
//! precedence rules.

use crate::error::TokenCheckError;
use crate::types::OutputFormat;
use crate::utils::{parse_duration_string, parse_scope_list};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// workers = 4
/// delay = "500ms"
/// min_scopes = ["repo"]
///
/// [output]
/// valid_output_file = "valid.txt"
///
/// [transport]
/// backoff_factor = "250ms"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output destinations and formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// HTTP transport tuning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Default worker count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Per-worker pacing delay (as string, e.g., "1s", "250ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    /// Transport retry budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    /// Per-request timeout (as string, e.g., "10s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Authorization-check endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Scopes every valid token must carry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scopes: Option<Vec<String>>,

    /// Mask tokens in human-readable output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<bool>,

    /// Output format name (text, json, csv)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    /// Default token list file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_file: Option<String>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Write the report here instead of stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    /// Export raw valid tokens to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_output_file: Option<String>,

    /// Include invalid results in the table and CSV
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_invalid: Option<bool>,
}

/// Transport tuning.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TransportConfig {
    /// Exponential backoff base factor (as string, e.g., "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<String>,

    /// Status codes retried with backoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_statuses: Option<Vec<u16>>,

    /// Authorization scheme (`token`, `Bearer`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<String>,

    /// User-Agent header value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which config files were merged
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, not valid TOML, or holds
    /// out-of-range values.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, TokenCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TokenCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            TokenCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the working
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, TokenCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let rank = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where set later"
                };
                tracing::info!(path = %path.display(), rank, "merged config file");
            }
        }

        Ok(merged_config)
    }

    /// Look for a config file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./token-check.toml", "./.token-check.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Look for a config file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".token-check.toml", "token-check.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// XDG Base Directory location.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("token-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win field by field.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: merge_section(lower.defaults, higher.defaults, |lower, higher| {
                DefaultsConfig {
                    workers: higher.workers.or(lower.workers),
                    delay: higher.delay.or(lower.delay),
                    retries: higher.retries.or(lower.retries),
                    timeout: higher.timeout.or(lower.timeout),
                    api_url: higher.api_url.or(lower.api_url),
                    min_scopes: higher.min_scopes.or(lower.min_scopes),
                    mask: higher.mask.or(lower.mask),
                    output_format: higher.output_format.or(lower.output_format),
                    tokens_file: higher.tokens_file.or(lower.tokens_file),
                }
            }),
            output: merge_section(lower.output, higher.output, |lower, higher| OutputConfig {
                output_file: higher.output_file.or(lower.output_file),
                valid_output_file: higher.valid_output_file.or(lower.valid_output_file),
                include_invalid: higher.include_invalid.or(lower.include_invalid),
            }),
            transport: merge_section(lower.transport, higher.transport, |lower, higher| {
                TransportConfig {
                    backoff_factor: higher.backoff_factor.or(lower.backoff_factor),
                    retry_statuses: higher.retry_statuses.or(lower.retry_statuses),
                    auth_scheme: higher.auth_scheme.or(lower.auth_scheme),
                    user_agent: higher.user_agent.or(lower.user_agent),
                }
            }),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), TokenCheckError> {
        if let Some(defaults) = &config.defaults {
            if let Some(workers) = defaults.workers {
                if workers == 0 || workers > 100 {
                    return Err(TokenCheckError::config("Workers must be between 1 and 100"));
                }
            }

            if let Some(raw) = &defaults.delay {
                validate_duration("delay", raw)?;
            }
            if let Some(raw) = &defaults.timeout {
                if validate_duration("timeout", raw)?.is_zero() {
                    return Err(TokenCheckError::config(format!(
                        "Invalid timeout '{}': must be greater than zero",
                        raw
                    )));
                }
            }

            if let Some(format) = &defaults.output_format {
                format
                    .parse::<OutputFormat>()
                    .map_err(TokenCheckError::config)?;
            }

            if let Some(url) = &defaults.api_url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(TokenCheckError::config(format!(
                        "api_url '{}' must start with http:// or https://",
                        url
                    )));
                }
            }
        }

        if let Some(transport) = &config.transport {
            if let Some(raw) = &transport.backoff_factor {
                validate_duration("backoff_factor", raw)?;
            }
            if let Some(statuses) = &transport.retry_statuses {
                if let Some(bad) = statuses.iter().find(|s| !(100..=599).contains(*s)) {
                    return Err(TokenCheckError::config(format!(
                        "Invalid HTTP status {} in retry_statuses",
                        bad
                    )));
                }
            }
        }

        Ok(())
    }
}

fn merge_section<T>(
    lower: Option<T>,
    higher: Option<T>,
    merge: impl FnOnce(T, T) -> T,
) -> Option<T> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(merge(lower, higher)),
        (lower, higher) => higher.or(lower),
    }
}

fn validate_duration(key: &str, raw: &str) -> Result<Duration, TokenCheckError> {
    match parse_duration_string(raw) {
        Some(duration) => Ok(duration),
        None => Err(TokenCheckError::config(format!(
            "Invalid {} '{}'. Use format like '500ms', '1s', '2m'",
            key, raw
        ))),
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via TC_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub workers: Option<usize>,
    pub delay: Option<String>,
    pub retries: Option<u32>,
    pub timeout: Option<String>,
    pub api_url: Option<String>,
    pub min_scopes: Option<Vec<String>>,
    pub mask: Option<bool>,
    pub output_format: Option<OutputFormat>,
    pub tokens_file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load `TC_*` configuration through an arbitrary lookup function.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("TC_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if (1..=100).contains(&workers) => env_config.workers = Some(workers),
            _ => tracing::warn!("Invalid TC_WORKERS='{}', must be 1-100", val),
        }
    }

    if let Some(val) = lookup("TC_DELAY") {
        if parse_duration_string(&val).is_some() {
            env_config.delay = Some(val);
        } else {
            tracing::warn!("Invalid TC_DELAY='{}', use format like '1s' or '250ms'", val);
        }
    }

    if let Some(val) = lookup("TC_RETRIES") {
        match val.trim().parse::<u32>() {
            Ok(retries) => env_config.retries = Some(retries),
            Err(_) => tracing::warn!("Invalid TC_RETRIES='{}', must be a whole number", val),
        }
    }

    if let Some(val) = lookup("TC_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) if !timeout.is_zero() => env_config.timeout = Some(val),
            _ => tracing::warn!("Invalid TC_TIMEOUT='{}', use format like '5s', '30s', '2m'", val),
        }
    }

    env_config.api_url = non_empty(lookup("TC_API_URL"));

    if let Some(val) = lookup("TC_MIN_SCOPES") {
        let scopes = parse_scope_list(&val);
        if !scopes.is_empty() {
            env_config.min_scopes = Some(scopes);
        }
    }

    if let Some(val) = lookup("TC_MASK") {
        match parse_bool(&val) {
            Some(mask) => env_config.mask = Some(mask),
            None => tracing::warn!("Invalid TC_MASK='{}', use true/false", val),
        }
    }

    if let Some(val) = lookup("TC_OUTPUT_FORMAT") {
        match val.parse::<OutputFormat>() {
            Ok(format) => env_config.output_format = Some(format),
            Err(e) => tracing::warn!("Invalid TC_OUTPUT_FORMAT: {}", e),
        }
    }

    env_config.tokens_file = non_empty(lookup("TC_TOKENS_FILE"));
    env_config.config = non_empty(lookup("TC_CONFIG"));

    env_config
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
