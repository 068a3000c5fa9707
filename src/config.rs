//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::client::ApiClientConfig;
use crate::dashboard::ChartOrder;
use crate::export::{ExportOptions, DEFAULT_SHEET_NAME};
use crate::gate::DEFAULT_PASSPHRASE;
use crate::push::{ws_url_from_http, PushConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub push: PushSettings,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reservation service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.clone(),
            request_timeout_ms: self.request_timeout_secs * 1000,
        }
    }
}

/// Push channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    #[serde(default = "default_push_enabled")]
    pub enabled: bool,

    /// Websocket origin; derived from `api.base_url` when unset
    pub url: Option<String>,

    #[serde(default = "default_push_path")]
    pub path: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_event")]
    pub event: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_push_enabled() -> bool {
    true
}

fn default_push_path() -> String {
    "/socket.io/".to_string()
}

fn default_namespace() -> String {
    "/".to_string()
}

fn default_event() -> String {
    "nueva-reserva".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_buffer() -> usize {
    64
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            enabled: default_push_enabled(),
            url: None,
            path: default_push_path(),
            namespace: default_namespace(),
            event: default_event(),
            connect_timeout_secs: default_connect_timeout(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            buffer: default_buffer(),
        }
    }
}

impl PushSettings {
    /// Transport configuration, falling back to the API origin
    pub fn push_config(&self, api: &ApiConfig) -> PushConfig {
        PushConfig {
            url: self
                .url
                .clone()
                .unwrap_or_else(|| ws_url_from_http(&api.base_url)),
            path: self.path.clone(),
            namespace: self.namespace.clone(),
            event: self.event.clone(),
            connect_timeout_ms: self.connect_timeout_secs * 1000,
            max_reconnect_attempts: self.max_reconnect_attempts,
            buffer: self.buffer.max(1),
        }
    }
}

/// Access gate configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_passphrase")]
    pub passphrase: String,

    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_passphrase() -> String {
    DEFAULT_PASSPHRASE.to_string()
}

fn default_state_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("reservas").to_string_lossy().to_string())
        .unwrap_or_else(|| "./reservas_state".to_string())
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            passphrase: default_passphrase(),
            state_dir: default_state_dir(),
        }
    }
}

impl GateConfig {
    /// State directory with a leading `~/` expanded
    pub fn state_path(&self) -> PathBuf {
        match (self.state_dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.state_dir),
        }
    }
}

/// Spreadsheet export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            sheet_name: default_sheet_name(),
        }
    }
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            output_dir: PathBuf::from(&self.output_dir),
            sheet_name: self.sheet_name.clone(),
        }
    }
}

/// Dashboard display configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub chart_order: ChartOrder,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("reservas").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        Self::load_first(config_paths.iter().flatten())
    }

    /// Load the first config among `paths` that exists and parses
    ///
    /// Falls back to defaults with environment overrides.
    pub fn load_first<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RESERVAS_API_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("RESERVAS_PUSH_URL") {
            self.push.url = Some(url);
        }
        if let Some(dir) = lookup("RESERVAS_STATE_DIR") {
            self.gate.state_dir = dir;
        }
        if let Some(passphrase) = lookup("RESERVAS_PASSPHRASE") {
            self.gate.passphrase = passphrase;
        }
        if let Some(level) = lookup("RESERVAS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("RESERVAS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Reservas Configuration
#
# Environment variables override these settings:
# - RESERVAS_API_URL
# - RESERVAS_PUSH_URL
# - RESERVAS_STATE_DIR
# - RESERVAS_PASSPHRASE
# - RESERVAS_LOG_LEVEL
# - RESERVAS_LOG_FORMAT

[api]
# Reservation service base URL
base_url = "http://localhost:3001"

# Request timeout in seconds
request_timeout_secs = 10

[push]
# Receive new reservations live while the dashboard is open
enabled = true

# Websocket origin (defaults to api.base_url with a ws:// scheme)
# url = "ws://localhost:3001"

# Socket.IO endpoint, namespace and event name
path = "/socket.io/"
namespace = "/"
event = "nueva-reserva"

# Handshake timeout in seconds
connect_timeout_secs = 5

# Reconnect attempts before live updates are given up
max_reconnect_attempts = 5

# Events buffered while the dashboard is busy
buffer = 64

[gate]
# Shared admin passphrase
passphrase = "1234admin"

# Where the unlocked flag is kept between runs
state_dir = "~/.local/share/reservas"

[export]
# Directory for exported spreadsheets
output_dir = "."

# Worksheet name in reservas.xlsx
sheet_name = "Reservas"

[dashboard]
# Chart bar order: date or first-seen
chart_order = "date"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3001");
        assert_eq!(config.gate.passphrase, "1234admin");
        assert_eq!(config.export.sheet_name, "Reservas");
        assert_eq!(config.dashboard.chart_order, ChartOrder::Date);
        assert!(config.push.enabled);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.push.event, "nueva-reserva");
        assert_eq!(config.push.url, None);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://reservas.example.com\"\n\n[dashboard]\nchart_order = \"first-seen\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://reservas.example.com");
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.dashboard.chart_order, ChartOrder::FirstSeen);
        assert_eq!(config.gate.passphrase, "1234admin");
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[api\nbase_url = 1").unwrap();
        assert!(matches!(Config::load(&broken), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_first_skips_broken_file() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[api\nbase_url = 1").unwrap();
        let good = dir.path().join("config.toml");
        std::fs::write(&good, "[export]\nsheet_name = \"Junio\"\n").unwrap();
        let missing = dir.path().join("missing.toml");

        let config = Config::load_first([&missing, &broken, &good]);
        assert_eq!(config.export.sheet_name, "Junio");

        let fallback = Config::load_first([&missing, &broken]);
        assert_eq!(fallback.export.sheet_name, "Reservas");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RESERVAS_API_URL", "http://10.0.0.5:3001"),
            ("RESERVAS_PASSPHRASE", "otra"),
            ("RESERVAS_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://10.0.0.5:3001");
        assert_eq!(config.gate.passphrase, "otra");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_push_url_derived_from_api() {
        let mut config = Config::default();
        config.api.base_url = "https://reservas.example.com/".to_string();

        let push = config.push.push_config(&config.api);
        assert_eq!(push.url, "wss://reservas.example.com");
        assert_eq!(push.connect_timeout_ms, 5000);

        config.push.url = Some("ws://push.internal:4000".to_string());
        assert_eq!(
            config.push.push_config(&config.api).url,
            "ws://push.internal:4000"
        );
    }
}
