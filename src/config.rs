//! Configuration management for opschat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Precedence is file < environment < command line.

use crate::cli::{Cli, QueryArgs};
use crate::error::{OpschatError, Result};
use crate::protocol::QueryOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for opschat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Chat service endpoints
    #[serde(default)]
    pub api: ApiConfig,
    /// Default data selection for each message
    #[serde(default)]
    pub chat: ChatConfig,
    /// Background status refresh
    #[serde(default)]
    pub status: StatusConfig,
}

/// Chat service endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the WebSocket endpoint
    ///
    /// When unset it is derived from `base_url` by swapping `http` for `ws`
    /// and `https` for `wss`.
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Per-request timeout for REST calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Data selection sent with each chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_true")]
    pub include_metrics: bool,

    #[serde(default = "default_true")]
    pub include_logs: bool,

    #[serde(default = "default_true")]
    pub include_traces: bool,

    /// Look-back window, e.g. `15m`, `1h`, `7d`
    #[serde(default = "default_time_range")]
    pub time_range: String,
}

fn default_true() -> bool {
    true
}

fn default_time_range() -> String {
    "1h".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            include_metrics: true,
            include_logs: true,
            include_traces: true,
            time_range: default_time_range(),
        }
    }
}

/// Status refresh configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Refresh `/status` in the background during chat sessions
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between refreshes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OpschatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| OpschatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("OPSCHAT_API_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(ws_url) = std::env::var("OPSCHAT_WS_URL") {
            self.api.ws_url = Some(ws_url);
        }

        if let Ok(timeout) = std::env::var("OPSCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid OPSCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(time_range) = std::env::var("OPSCHAT_TIME_RANGE") {
            self.chat.time_range = time_range;
        }

        if let Ok(interval) = std::env::var("OPSCHAT_STATUS_INTERVAL") {
            if let Ok(value) = interval.parse() {
                self.status.poll_interval_seconds = value;
            } else {
                tracing::warn!("Invalid OPSCHAT_STATUS_INTERVAL: {}", interval);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(api_url) = &cli.api_url {
            self.api.base_url = api_url.clone();
        }

        if let Some(query) = cli.command.query_args() {
            self.apply_query_args(query);
        }
    }

    fn apply_query_args(&mut self, query: &QueryArgs) {
        if let Some(time_range) = &query.time_range {
            self.chat.time_range = time_range.clone();
        }
        if query.no_metrics {
            self.chat.include_metrics = false;
        }
        if query.no_logs {
            self.chat.include_logs = false;
        }
        if query.no_traces {
            self.chat.include_traces = false;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if a URL has the wrong scheme, a duration is zero, or
    /// the time range is malformed
    pub fn validate(&self) -> Result<()> {
        let base = self.api_base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(OpschatError::Config(format!(
                "api.base_url must use http or https, got {}",
                base.scheme()
            ))
            .into());
        }

        let ws = self.ws_base_url()?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(OpschatError::Config(format!(
                "api.ws_url must use ws or wss, got {}",
                ws.scheme()
            ))
            .into());
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(OpschatError::Config(
                "api.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.status.poll_interval_seconds == 0 {
            return Err(OpschatError::Config(
                "status.poll_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if !is_valid_time_range(&self.chat.time_range) {
            return Err(OpschatError::Config(format!(
                "chat.time_range must look like 15m, 1h or 7d, got {:?}",
                self.chat.time_range
            ))
            .into());
        }

        Ok(())
    }

    /// Parsed REST base URL.
    ///
    /// # Errors
    ///
    /// Returns [`OpschatError::Config`] when `api.base_url` does not parse
    pub fn api_base_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.api.base_url).map_err(|e| {
            OpschatError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
                .into()
        })
    }

    /// WebSocket base URL, either configured or derived from the REST base.
    ///
    /// # Errors
    ///
    /// Returns [`OpschatError::Config`] when either URL does not parse or the
    /// REST base has a scheme that has no WebSocket counterpart
    pub fn ws_base_url(&self) -> Result<url::Url> {
        if let Some(ws_url) = &self.api.ws_url {
            return url::Url::parse(ws_url).map_err(|e| {
                OpschatError::Config(format!("Invalid api.ws_url {}: {}", ws_url, e)).into()
            });
        }

        let base = self.api_base_url()?;
        let scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(OpschatError::Config(format!(
                    "Cannot derive a WebSocket URL from scheme {}",
                    other
                ))
                .into())
            }
        };

        // Url::set_scheme refuses http -> ws, so rebuild from the string form.
        let rest = &base.as_str()[base.scheme().len()..];
        url::Url::parse(&format!("{scheme}{rest}"))
            .map_err(|e| OpschatError::Config(format!("Invalid WebSocket URL: {}", e)).into())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.status.poll_interval_seconds)
    }

    /// Data selection for outbound messages.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            include_metrics: self.chat.include_metrics,
            include_logs: self.chat.include_logs,
            include_traces: self.chat.include_traces,
            time_range: self.chat.time_range.clone(),
        }
    }
}

/// A positive integer followed by one of `s`, `m`, `h`, `d`.
fn is_valid_time_range(value: &str) -> bool {
    let Some(unit) = value.chars().last() else {
        return false;
    };
    if !matches!(unit, 's' | 'm' | 'h' | 'd') {
        return false;
    }
    let digits = &value[..value.len() - 1];
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && digits.parse::<u64>().is_ok_and(|n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: [&str; 5] = [
        "OPSCHAT_API_URL",
        "OPSCHAT_WS_URL",
        "OPSCHAT_TIMEOUT_SECONDS",
        "OPSCHAT_TIME_RANGE",
        "OPSCHAT_STATUS_INTERVAL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.api.ws_url.is_none());
        assert_eq!(config.api.request_timeout_seconds, 30);
        assert!(config.chat.include_metrics);
        assert!(config.chat.include_logs);
        assert!(config.chat.include_traces);
        assert_eq!(config.chat.time_range, "1h");
        assert!(config.status.enabled);
        assert_eq!(config.status.poll_interval_seconds, 30);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_query_options_match_chat_config() {
        let mut config = Config::default();
        config.chat.include_logs = false;
        config.chat.time_range = "24h".to_string();

        let options = config.query_options();
        assert!(options.include_metrics);
        assert!(!options.include_logs);
        assert_eq!(options.time_range, "24h");
    }

    #[test]
    fn test_config_validation_rejects_non_http_base() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_unparsable_base() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_http_ws_url() {
        let mut config = Config::default();
        config.api.ws_url = Some("http://localhost:8000".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_poll_interval() {
        let mut config = Config::default();
        config.status.poll_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_time_range_validation() {
        for good in ["1h", "15m", "30s", "7d", "120m"] {
            assert!(is_valid_time_range(good), "{good} should be valid");
        }
        for bad in ["", "h", "0h", "1w", "-1h", "1.5h", "one hour", "1 h"] {
            assert!(!is_valid_time_range(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_ws_url_derived_from_base() {
        let mut config = Config::default();
        assert_eq!(config.ws_base_url().unwrap().as_str(), "ws://localhost:8000/");

        config.api.base_url = "https://ops.example.com/chat".to_string();
        assert_eq!(
            config.ws_base_url().unwrap().as_str(),
            "wss://ops.example.com/chat"
        );
    }

    #[test]
    fn test_ws_url_explicit_wins() {
        let mut config = Config::default();
        config.api.ws_url = Some("ws://other:9000".to_string());
        assert_eq!(config.ws_base_url().unwrap().as_str(), "ws://other:9000/");
    }

    #[test]
    fn test_parse_yaml_config_with_partial_sections() {
        let yaml = r#"
api:
  base_url: https://ops.example.com
chat:
  include_traces: false
  time_range: 6h
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://ops.example.com");
        assert_eq!(config.api.request_timeout_seconds, 30);
        assert!(config.chat.include_metrics);
        assert!(!config.chat.include_traces);
        assert_eq!(config.chat.time_range, "6h");
        assert!(config.status.enabled);
    }

    #[test]
    fn test_parse_empty_yaml_mapping_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        clear_env();
        let config = Config::load("/nonexistent/opschat.yaml", &Cli::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api:\n  base_url: http://chat.internal:9000\nstatus:\n  enabled: false"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap(), &Cli::default()).unwrap();
        assert_eq!(config.api.base_url, "http://chat.internal:9000");
        assert!(!config.status.enabled);
    }

    #[test]
    #[serial]
    fn test_load_invalid_yaml_is_config_error() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api: [unclosed").unwrap();

        let err = Config::load(file.path().to_str().unwrap(), &Cli::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OpschatError>(),
            Some(OpschatError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_file_values() {
        clear_env();
        std::env::set_var("OPSCHAT_API_URL", "http://env-host:8000");
        std::env::set_var("OPSCHAT_WS_URL", "ws://env-host:8001");
        std::env::set_var("OPSCHAT_TIMEOUT_SECONDS", "5");
        std::env::set_var("OPSCHAT_TIME_RANGE", "15m");
        std::env::set_var("OPSCHAT_STATUS_INTERVAL", "10");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.api.base_url, "http://env-host:8000");
        assert_eq!(config.api.ws_url, Some("ws://env-host:8001".to_string()));
        assert_eq!(config.api.request_timeout_seconds, 5);
        assert_eq!(config.chat.time_range, "15m");
        assert_eq!(config.status.poll_interval_seconds, 10);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_ignores_invalid_numbers() {
        clear_env();
        std::env::set_var("OPSCHAT_TIMEOUT_SECONDS", "soon");
        std::env::set_var("OPSCHAT_STATUS_INTERVAL", "-3");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.api.request_timeout_seconds, 30);
        assert_eq!(config.status.poll_interval_seconds, 30);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_beat_env() {
        clear_env();
        std::env::set_var("OPSCHAT_TIME_RANGE", "15m");
        std::env::set_var("OPSCHAT_API_URL", "http://env-host:8000");

        let cli = Cli {
            api_url: Some("http://cli-host:8000".to_string()),
            command: Commands::Chat {
                query: QueryArgs {
                    time_range: Some("2h".to_string()),
                    no_metrics: true,
                    no_logs: false,
                    no_traces: true,
                },
            },
            ..Cli::default()
        };

        let config = Config::load("/nonexistent/opschat.yaml", &cli).unwrap();
        clear_env();

        assert_eq!(config.api.base_url, "http://cli-host:8000");
        assert_eq!(config.chat.time_range, "2h");
        assert!(!config.chat.include_metrics);
        assert!(config.chat.include_logs);
        assert!(!config.chat.include_traces);
    }
}
