//! Configuration management for Zero services.
//!
//! The screener shares the unified configuration file at `~/.codecoder/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ZERO_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_SCREENER_CONFIG` → alternate config file path
//! - `ZERO_SCREENER_PORT` → screener.port
//! - `ZERO_BIND_ADDRESS` → network.bind
//! - `ZERO_LOG_LEVEL` → observability.log_level
//! - `ZERO_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map_or_else(
            || PathBuf::from(".codecoder"),
            |dirs| dirs.home_dir().join(".codecoder"),
        )
}

/// Get the configuration file path.
///
/// `ZERO_SCREENER_CONFIG` takes precedence over the default location.
pub fn config_path() -> PathBuf {
    std::env::var("ZERO_SCREENER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join("config.json"))
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Global network configuration.
///
/// Default bind address is `127.0.0.1` (local only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address for all services.
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to clamp to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Screener Service Configuration
// ============================================================================

/// Screener service configuration.
///
/// Tuning fields are optional; the service applies its own defaults and
/// clamps every value into a bounded range before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerServiceConfig {
    /// HTTP port
    #[serde(default = "default_screener_port")]
    pub port: u16,

    /// HTTP host (falls back to `network.bind` when absent)
    #[serde(default)]
    pub host: Option<String>,

    /// Worker pool size for per-candidate enrichment
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Number of pre-filtered rows sent to deep enrichment
    #[serde(default)]
    pub candidate_pool_size: Option<usize>,

    /// Maximum number of results returned by a run
    #[serde(default)]
    pub result_limit: Option<usize>,

    /// Per-call timeout for outbound provider fetches
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    /// Calendar-day lookback requested from the history provider
    #[serde(default)]
    pub history_lookback_days: Option<u32>,

    /// Symbols per real-time quote request
    #[serde(default)]
    pub quote_chunk_size: Option<usize>,

    /// TTL for the read-through history cache (0 disables caching)
    #[serde(default)]
    pub history_cache_ttl_secs: Option<u64>,

    /// Override for the market snapshot endpoint
    #[serde(default)]
    pub snapshot_url: Option<String>,

    /// Override for the daily K-line endpoint
    #[serde(default)]
    pub kline_url: Option<String>,

    /// Override for the real-time quote endpoint
    #[serde(default)]
    pub quote_url: Option<String>,
}

impl Default for ScreenerServiceConfig {
    fn default() -> Self {
        Self {
            port: default_screener_port(),
            host: None,
            max_concurrency: None,
            candidate_pool_size: None,
            result_limit: None,
            fetch_timeout_secs: None,
            history_lookback_days: None,
            quote_chunk_size: None,
            history_cache_ttl_secs: None,
            snapshot_url: None,
            kline_url: None,
            quote_url: None,
        }
    }
}

fn default_screener_port() -> u16 {
    4436 // Part of 4430-4439 range for Rust microservices
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Global network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Screener service configuration
    #[serde(default)]
    pub screener: Option<ScreenerServiceConfig>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("ZERO_SCREENER_PORT") {
            if let Ok(p) = port.parse() {
                self.screener.get_or_insert_with(Default::default).port = p;
            }
        }

        if let Ok(bind) = std::env::var("ZERO_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Ok(level) = std::env::var("ZERO_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(format) = std::env::var("ZERO_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Screener section, or defaults when absent.
    pub fn screener(&self) -> ScreenerServiceConfig {
        self.screener.clone().unwrap_or_default()
    }

    /// Effective host for the screener HTTP server.
    pub fn screener_host(&self) -> &str {
        self.screener
            .as_ref()
            .and_then(|s| s.host.as_deref())
            .unwrap_or(&self.network.bind)
    }

    /// Effective port for the screener HTTP server.
    pub fn screener_port(&self) -> u16 {
        self.screener
            .as_ref()
            .map(|s| s.port)
            .unwrap_or_else(default_screener_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "pretty");
        assert!(config.screener.is_none());
        assert_eq!(config.screener_port(), 4436);
        assert_eq!(config.screener_host(), "127.0.0.1");
    }

    #[test]
    fn test_partial_screener_section() {
        let json = r#"{
            "observability": { "level": "debug" },
            "screener": { "max_concurrency": 3, "host": "0.0.0.0" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        let screener = config.screener();
        assert_eq!(screener.port, 4436);
        assert_eq!(screener.max_concurrency, Some(3));
        assert!(screener.candidate_pool_size.is_none());
        assert_eq!(config.screener_host(), "0.0.0.0");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "network": {{ "bind": "0.0.0.0" }}, "screener": {{ "port": 5000 }} }}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.network.bind, "0.0.0.0");
        assert_eq!(config.screener_port(), 5000);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
